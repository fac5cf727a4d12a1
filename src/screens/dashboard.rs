//! Dashboard: formats the backend's pre-aggregated statistics.
//!
//! Nothing is aggregated here. The view keeps the last good snapshot, knows
//! when the next auto-refresh is due, and provides the cosmetic helpers
//! (fill-rate tone, relative time, percentage bars).

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::api::types::DashboardStats;
use crate::api::{ApiError, Backend};
use crate::notice::NoticeBoard;
use crate::period::format_date_fr;

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;

pub const BAR_WIDTH: usize = 20;

// =============================================================================
// FORMATTING HELPERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTone {
    Critical,
    High,
    Healthy,
    Low,
}

impl FillTone {
    /// Bucket a fill rate given in percent.
    #[must_use]
    pub fn for_rate(rate: f64) -> Self {
        if rate >= 90.0 {
            Self::Critical
        } else if rate >= 70.0 {
            Self::High
        } else if rate >= 50.0 {
            Self::Healthy
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#e74c3c",
            Self::High => "#f39c12",
            Self::Healthy => "#27ae60",
            Self::Low => "#95a5a6",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "rouge",
            Self::High => "orange",
            Self::Healthy => "vert",
            Self::Low => "gris",
        }
    }
}

/// French relative time for an RFC 3339 timestamp. Falls back to
/// `dd/mm/yyyy` after a week, and to the raw text when it does not parse.
#[must_use]
pub fn relative_time(timestamp: &str, now: OffsetDateTime) -> String {
    let Ok(at) = OffsetDateTime::parse(timestamp.trim(), &Rfc3339) else {
        return timestamp.to_owned();
    };
    let elapsed = now - at;
    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();

    if minutes < 1 {
        "À l'instant".to_owned()
    } else if minutes < 60 {
        format!("Il y a {minutes} min")
    } else if hours < 24 {
        format!("Il y a {hours} h")
    } else if days < 7 {
        format!("Il y a {days} j")
    } else {
        format_date_fr(at.date())
    }
}

/// Fixed-width text bar for a percentage clamped to `0..=100`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn percent_bar(rate: f64, width: usize) -> String {
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 100.0) };
    let filled = ((rate / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Share of `part` in `total`, in percent; zero when `total` is zero.
#[must_use]
pub fn rate(part: u32, total: u32) -> f64 {
    if total == 0 { 0.0 } else { f64::from(part) / f64::from(total) * 100.0 }
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub stats: Option<DashboardStats>,
    pub last_error: Option<ApiError>,
    pub fetched_at: Option<Instant>,
    pub refresh_interval: Duration,
    pub notices: NoticeBoard,
}

impl DashboardView {
    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    #[must_use]
    pub fn new(refresh_interval: Duration) -> Self {
        Self { stats: None, last_error: None, fetched_at: None, refresh_interval, notices: NoticeBoard::default() }
    }

    /// Fetch a new snapshot. On failure the previous snapshot stays.
    ///
    /// # Errors
    ///
    /// The backend error, also kept in `last_error` and posted as a notice.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        self.refresh_at(backend, Instant::now()).await
    }

    /// # Errors
    ///
    /// As [`Self::refresh`].
    pub async fn refresh_at(&mut self, backend: &dyn Backend, now: Instant) -> Result<(), ApiError> {
        match backend.dashboard_stats().await {
            Ok(stats) => {
                tracing::debug!(last_updated = ?stats.last_updated, "dashboard stats refreshed");
                self.stats = Some(stats);
                self.fetched_at = Some(now);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "dashboard refresh failed");
                self.notices.error(err.user_message());
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn refresh_due_at(&self, now: Instant) -> bool {
        self.fetched_at.is_none_or(|at| now.saturating_duration_since(at) >= self.refresh_interval)
    }

    /// Plain-text rendering of the current snapshot.
    #[must_use]
    pub fn render(&self, now: OffsetDateTime) -> String {
        let Some(stats) = &self.stats else {
            return "Aucune donnée disponible".to_owned();
        };
        let mut out = String::new();
        render_overview(&mut out, stats);
        render_events(&mut out, stats);
        render_villages(&mut out, stats);
        render_alerts(&mut out, stats);
        render_activity(&mut out, stats, now);
        if let Some(updated) = &stats.last_updated {
            let _ = writeln!(out, "\nMis à jour : {}", relative_time(updated, now));
        }
        out
    }
}

fn render_overview(out: &mut String, stats: &DashboardStats) {
    let o = &stats.overview;
    let r = &stats.registrations;
    let _ = writeln!(out, "== Vue d'ensemble ==");
    let _ = writeln!(
        out,
        "Événements : {} ({} actifs, {} à venir, {} passés)",
        o.total_events, o.active_events, o.upcoming_events, o.past_events
    );
    let _ = writeln!(
        out,
        "Participants : {} (+{} ce mois-ci, tendance {:+.1} %)",
        o.total_participants, o.new_participants_this_month, stats.trends.participants_trend
    );
    let occupancy = rate(o.occupied_bungalows, o.total_bungalows);
    let _ = writeln!(
        out,
        "Bungalows occupés : {}/{} {} {:.0} %",
        o.occupied_bungalows,
        o.total_bungalows,
        percent_bar(occupancy, BAR_WIDTH),
        occupancy
    );
    let _ = writeln!(out, "Capacité totale : {} lits", o.total_bed_capacity);
    let _ = writeln!(
        out,
        "Inscriptions actives : {} ({} assignées, {} sans chambre)",
        r.active_total, r.assigned, r.unassigned
    );
}

fn render_events(out: &mut String, stats: &DashboardStats) {
    if !stats.events.active.is_empty() {
        let _ = writeln!(out, "\n== En cours ==");
        for event in &stats.events.active {
            let tone = FillTone::for_rate(event.fill_rate);
            let _ = writeln!(
                out,
                "{} [{}] {}/{} {} {:.0} % ({}), encore {} j",
                event.name,
                event.event_type.label(),
                event.registrations,
                event.capacity,
                percent_bar(event.fill_rate, BAR_WIDTH),
                event.fill_rate,
                tone.label(),
                event.days_remaining
            );
        }
    }
    if !stats.events.upcoming.is_empty() {
        let _ = writeln!(out, "\n== À venir ==");
        for event in &stats.events.upcoming {
            let _ = writeln!(
                out,
                "{} [{}] dans {} j, {}/{} ({:.0} %)",
                event.name,
                event.event_type.label(),
                event.days_until,
                event.registrations,
                event.capacity,
                event.fill_rate
            );
        }
    }
}

fn render_villages(out: &mut String, stats: &DashboardStats) {
    if stats.villages.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n== Villages ==");
    for village in &stats.villages {
        let _ = writeln!(
            out,
            "Village {} : {}/{} {} {:.0} %",
            village.name,
            village.current_occupants,
            village.total_capacity,
            percent_bar(village.occupancy_rate, BAR_WIDTH),
            village.occupancy_rate
        );
    }
}

fn render_alerts(out: &mut String, stats: &DashboardStats) {
    if stats.alerts.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n== Alertes ==");
    for alert in &stats.alerts {
        let _ = writeln!(out, "[{}] {}", alert.severity, alert.message);
    }
}

fn render_activity(out: &mut String, stats: &DashboardStats, now: OffsetDateTime) {
    if stats.recent_activities.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n== Activité récente ==");
    for activity in &stats.recent_activities {
        let _ = writeln!(
            out,
            "{} · {} ({})",
            relative_time(&activity.timestamp, now),
            activity.description,
            activity.user
        );
    }
}
