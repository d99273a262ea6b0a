use chrono::{DateTime, Local};

use crate::api::DashboardStats;

pub const CHART_LABELS: [&str; 3] = ["Pendentes", "Atrasadas", "Sem notificação"];
pub const CHART_DATASET: &str = "Tarefas";

/// The bar chart model. Created once, then updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartState {
    pub labels: [&'static str; 3],
    pub series: [u64; 3],
    /// Number of data sets applied so far; 1 right after creation.
    pub revision: u64,
}

impl ChartState {
    fn new(stats: &DashboardStats) -> Self {
        Self {
            labels: CHART_LABELS,
            series: series_for(stats),
            revision: 1,
        }
    }

    fn update(&mut self, stats: &DashboardStats) {
        self.series = series_for(stats);
        self.revision += 1;
    }

    pub fn bars(&self) -> Vec<(&'static str, u64)> {
        self.labels.iter().copied().zip(self.series).collect()
    }
}

fn series_for(stats: &DashboardStats) -> [u64; 3] {
    [stats.pending, stats.overdue, stats.no_notify]
}

pub struct DashboardModule {
    pub stats: Option<DashboardStats>,
    pub chart: Option<ChartState>,
    pub last_updated: Option<DateTime<Local>>,
    pub last_error: Option<String>,
}

impl DashboardModule {
    pub fn new() -> Self {
        Self {
            stats: None,
            chart: None,
            last_updated: None,
            last_error: None,
        }
    }

    pub fn apply(&mut self, stats: DashboardStats) {
        match self.chart.as_mut() {
            Some(chart) => chart.update(&stats),
            None => self.chart = Some(ChartState::new(&stats)),
        }
        self.stats = Some(stats);
        self.last_updated = Some(Local::now());
        self.last_error = None;
    }

    /// Diagnostics only; counters, chart and screen stay as they were.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Counter text for display; a dash until the first successful cycle.
    pub fn counter(&self, pick: fn(&DashboardStats) -> u64) -> String {
        self.stats
            .as_ref()
            .map(|s| pick(s).to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}
