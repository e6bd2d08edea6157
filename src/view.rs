//! The booking screen: one displayed day, its reserved hours, the selection
//! engine and the submissions made from it, driven one command at a time.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::{info, warn};

use crate::api::BookingApi;
use crate::command::{Command, HELP};
use crate::engine::{DragSession, EngineError, RangePicker, SelectionEngine, Toggle};
use crate::limits::*;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::reserved::{boundary_instant, reserved_ranges};
use crate::session::SessionContext;
use crate::submit::{SubmissionTracker, SubmitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    Engine(EngineError),
    Submit(SubmitError),
    /// The command touches an hour someone else already booked.
    Reserved(String),
}

impl From<EngineError> for ViewError {
    fn from(e: EngineError) -> Self {
        ViewError::Engine(e)
    }
}

impl From<SubmitError> for ViewError {
    fn from(e: SubmitError) -> Self {
        ViewError::Submit(e)
    }
}

impl std::fmt::Display for ViewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewError::Engine(e) => write!(f, "{e}"),
            ViewError::Submit(e) => write!(f, "{e}"),
            ViewError::Reserved(what) => write!(f, "{what} is already reserved"),
        }
    }
}

impl std::error::Error for ViewError {}

pub struct BookingView<Tz: TimeZone> {
    engine: SelectionEngine,
    day: DayKey,
    picker: RangePicker,
    tracker: SubmissionTracker,
    api: Arc<dyn BookingApi>,
    session: SessionContext,
    tz: Tz,
    rate: u32,
    court_id: u64,
}

impl<Tz: TimeZone> BookingView<Tz> {
    /// Reserved hours for `day` are not loaded until `show_day` runs.
    pub fn new(
        api: Arc<dyn BookingApi>,
        session: SessionContext,
        notify: Arc<NotifyHub>,
        tz: Tz,
        day: DayKey,
        rate: u32,
        court_id: u64,
    ) -> Self {
        Self {
            engine: SelectionEngine::new(),
            day,
            picker: RangePicker::new(day),
            tracker: SubmissionTracker::new(notify),
            api,
            session,
            tz,
            rate,
            court_id,
        }
    }

    pub fn engine(&self) -> &SelectionEngine {
        &self.engine
    }

    pub fn day(&self) -> DayKey {
        self.day
    }

    pub fn tracker(&self) -> &SubmissionTracker {
        &self.tracker
    }

    /// Display `day` and reload its reserved hours. The selection on other
    /// days is kept.
    pub async fn show_day(&mut self, day: DayKey) {
        self.day = day;
        self.picker = RangePicker::new(day);
        self.refresh_reserved().await;
    }

    /// A failed lookup leaves the day with no reserved hours; selection goes on.
    async fn refresh_reserved(&mut self) {
        let day = self.day;
        let day_start = match boundary_instant(&self.tz, day, 0) {
            Ok(instant) => instant,
            Err(e) => {
                warn!(%day, "cannot resolve local midnight: {e}");
                self.engine.set_reserved(day, Vec::new());
                return;
            }
        };
        match self.api.reserved_spans(day_start).await {
            Ok(spans) => {
                let reserved = reserved_ranges(&self.tz, day, &spans);
                info!(%day, ranges = reserved.len(), "reserved hours loaded");
                self.engine.set_reserved(day, reserved);
            }
            Err(e) => {
                warn!(%day, "reserved hours lookup failed: {e}");
                metrics::counter!(crate::observability::RESERVED_FETCH_FAILURES_TOTAL).increment(1);
                self.engine.set_reserved(day, Vec::new());
            }
        }
    }

    pub async fn handle(&mut self, cmd: Command) -> Result<Reply, ViewError> {
        let label = crate::observability::command_label(&cmd);
        let result = self.dispatch(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(crate::observability::COMMANDS_TOTAL, "command" => label, "status" => status)
            .increment(1);
        result
    }

    async fn dispatch(&mut self, cmd: Command) -> Result<Reply, ViewError> {
        let text = match cmd {
            Command::Day(day) => {
                self.show_day(day).await;
                self.day_heading()
            }
            Command::Today => {
                let today = Utc::now().with_timezone(&self.tz).date_naive();
                self.show_day(today).await;
                self.day_heading()
            }
            Command::Next => {
                let next = self.day.succ_opt().ok_or_else(|| {
                    EngineError::InvalidArgument(format!("no day after {}", self.day))
                })?;
                self.show_day(next).await;
                self.day_heading()
            }
            Command::Prev => {
                let prev = self.day.pred_opt().ok_or_else(|| {
                    EngineError::InvalidArgument(format!("no day before {}", self.day))
                })?;
                self.show_day(prev).await;
                self.day_heading()
            }
            Command::Toggle(hour) => {
                // deselecting is always allowed, even if the hour became reserved
                if !self.engine.is_selected(self.day, hour)
                    && !self.engine.is_selectable(self.day, hour)
                {
                    return Err(ViewError::Reserved(HourRange::single(hour).to_string()));
                }
                match self.engine.toggle_hour(self.day, hour) {
                    Toggle::Added => format!("selected {}", HourRange::single(hour)),
                    Toggle::Removed => format!("deselected {}", HourRange::single(hour)),
                }
            }
            Command::Range(a, b) => {
                let range = HourRange::spanning(a, b);
                if !self.engine.is_range_free(self.day, &range) {
                    return Err(ViewError::Reserved(range.to_string()));
                }
                let range = self.engine.add_range(self.day, a, b);
                format!("selected {range}")
            }
            Command::Start(hour) => {
                self.picker.pick_start(&self.engine, hour)?;
                let ends: Vec<String> = self
                    .picker
                    .end_options(&self.engine)
                    .into_iter()
                    .map(clock_label)
                    .collect();
                format!("start {}; end options: {}", clock_label(hour.get()), ends.join(", "))
            }
            Command::End(end) => {
                let range = self.picker.pick_end(&mut self.engine, end)?;
                format!("selected {range}")
            }
            Command::Drag { anchor, hovers } => self.drag(anchor, &hovers)?,
            Command::Clear => {
                self.engine.clear_day(self.day);
                self.picker.reset();
                format!("cleared {}", day_label(self.day))
            }
            Command::Grid => self.render_grid(),
            Command::Show => self.render_selection(),
            Command::Submit => self.submit().await?,
            Command::Retry => {
                let summary = self
                    .tracker
                    .retry_failed(self.api.as_ref(), &self.session)
                    .await?;
                format!("retried: {summary}")
            }
            Command::Status => self.render_status(),
            Command::WhoAmI => match self.session.user() {
                Some(user) => format!(
                    "{} ({:?}{})",
                    user.email,
                    user.role,
                    if self.session.manager().is_ok() { ", manager access" } else { "" }
                ),
                None => "not signed in".to_string(),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    /// Press on `anchor`, hover each hour in turn, release. Hovers whose span
    /// would cross a reserved hour are ignored, as a disabled cell would be.
    fn drag(&mut self, anchor: Hour, hovers: &[Hour]) -> Result<String, ViewError> {
        if !self.engine.is_selectable(self.day, anchor) {
            return Err(ViewError::Reserved(HourRange::single(anchor).to_string()));
        }
        let mut drag = DragSession::begin(&self.engine, self.day, anchor);
        for &hour in hovers {
            if self.engine.is_range_free(self.day, &HourRange::spanning(anchor, hour)) {
                drag.hover(&mut self.engine, hour);
            }
        }
        match drag.finish() {
            Some(range) => Ok(format!("selected {range}")),
            None => Ok("nothing selected".to_string()),
        }
    }

    /// The whole selection goes to the tracker. If nothing could be queued it
    /// is put back untouched.
    async fn submit(&mut self) -> Result<String, ViewError> {
        self.session.authenticated().map_err(SubmitError::from)?;
        if self.engine.is_empty() {
            return Err(SubmitError::Engine(EngineError::EmptySelection).into());
        }
        let already = self.tracker.entries().len();
        let selection = self.engine.take();
        let result = self
            .tracker
            .submit(
                self.api.as_ref(),
                &self.session,
                &self.tz,
                selection.clone(),
                self.rate,
                self.court_id,
            )
            .await;
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                for (day, day_selection) in &selection {
                    self.engine.replace_day(*day, day_selection.ranges());
                }
                return Err(e.into());
            }
        };
        self.picker.reset();

        let mut out = String::new();
        for entry in &self.tracker.entries()[already..] {
            let _ = writeln!(out, "{} {}  {}", day_label(entry.day), entry.range, entry.status);
        }
        let _ = write!(out, "submitted: {summary}");
        Ok(out)
    }

    fn day_heading(&self) -> String {
        let reserved = self.engine.reserved(self.day);
        let hours: u32 = reserved.iter().map(|r| r.duration_hours() as u32).sum();
        format!("{} ({hours} hours reserved)", day_label(self.day))
    }

    fn render_grid(&self) -> String {
        let mut out = self.day_heading();
        for hour in 0..HOURS_PER_DAY {
            let Ok(hour) = Hour::new(hour) else { break };
            let mark = if self.engine.is_reserved(self.day, hour) {
                "reserved"
            } else if self.engine.is_selected(self.day, hour) {
                "selected"
            } else {
                "free"
            };
            let _ = write!(out, "\n{:>8}  {mark}", clock_label(hour.get()));
        }
        out
    }

    fn render_selection(&self) -> String {
        if self.engine.is_empty() {
            return "no time ranges selected".to_string();
        }
        let mut out = String::new();
        for day in self.engine.days() {
            let _ = writeln!(out, "{}", day_label(day));
            for range in self.engine.ranges(day) {
                let _ = writeln!(out, "  {range}");
            }
        }
        let _ = write!(out, "{} hours", self.engine.total_hours());
        out
    }

    fn render_status(&self) -> String {
        let entries = self.tracker.entries();
        if entries.is_empty() {
            return "nothing submitted".to_string();
        }
        let mut out = String::new();
        for entry in entries {
            let _ = writeln!(
                out,
                "{} {} {}  {}",
                entry.id,
                day_label(entry.day),
                entry.range,
                entry.status
            );
        }
        let _ = write!(out, "{}", self.tracker.summary());
        out
    }
}
