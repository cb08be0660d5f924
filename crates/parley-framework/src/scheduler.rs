//! Cron schedules.
//!
//! Scheduled jobs are event-less handlers run on a cron schedule. Each job
//! gets one task that sleeps until the next fire time and then spawns the
//! job with the same failure containment as event handlers.
//!
//! Expressions use the six-field form `sec min hour day-of-month month
//! day-of-week`; [`CronFields`] builds one field by field.
//!
//! ```rust,ignore
//! bot.on_schedule(CronFields::new().minute("*/5"))
//!     .name("heartbeat")
//!     .handle(heartbeat)?;
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bot::Bot;
use crate::error::{FrameworkError, FrameworkResult};
use crate::handler::{BoxedJob, HandlerResult, into_job};
use crate::task::spawn_guarded;

/// Field-by-field cron schedule.
///
/// Unset fields are `*`, except seconds which default to `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronFields {
    second: String,
    minute: String,
    hour: String,
    day: String,
    month: String,
    weekday: String,
}

impl Default for CronFields {
    fn default() -> Self {
        Self::new()
    }
}

impl CronFields {
    /// Every minute, on the minute.
    pub fn new() -> Self {
        Self {
            second: "0".into(),
            minute: "*".into(),
            hour: "*".into(),
            day: "*".into(),
            month: "*".into(),
            weekday: "*".into(),
        }
    }

    /// Sets the seconds field.
    pub fn second(mut self, value: impl Into<String>) -> Self {
        self.second = value.into();
        self
    }

    /// Sets the minutes field.
    pub fn minute(mut self, value: impl Into<String>) -> Self {
        self.minute = value.into();
        self
    }

    /// Sets the hours field.
    pub fn hour(mut self, value: impl Into<String>) -> Self {
        self.hour = value.into();
        self
    }

    /// Sets the day-of-month field.
    pub fn day(mut self, value: impl Into<String>) -> Self {
        self.day = value.into();
        self
    }

    /// Sets the month field.
    pub fn month(mut self, value: impl Into<String>) -> Self {
        self.month = value.into();
        self
    }

    /// Sets the day-of-week field.
    pub fn weekday(mut self, value: impl Into<String>) -> Self {
        self.weekday = value.into();
        self
    }
}

impl fmt::Display for CronFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.second, self.minute, self.hour, self.day, self.month, self.weekday
        )
    }
}

#[derive(Clone)]
struct ScheduledJob {
    name: String,
    schedule: Schedule,
    job: BoxedJob,
}

#[derive(Default)]
struct SchedulerState {
    jobs: Vec<ScheduledJob>,
    running: Option<CancellationToken>,
    started: usize,
}

/// Holds scheduled jobs and runs them once started.
#[derive(Default)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of scheduled jobs.
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of job tasks spawned since [`start`](Self::start).
    pub fn started(&self) -> usize {
        self.state.lock().started
    }

    /// Starts every scheduled job. Jobs added later start immediately.
    pub fn start(&self, bot: &Bot, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut state = self.state.lock();
        state.running = Some(shutdown.clone());
        state.started += state.jobs.len();
        if !state.jobs.is_empty() {
            info!(jobs = state.jobs.len(), "Scheduler started");
        }
        state
            .jobs
            .iter()
            .map(|job| run_job(bot.clone(), job.clone(), shutdown.clone()))
            .collect()
    }

    fn add(&self, bot: &Bot, job: ScheduledJob) {
        debug!(job = %job.name, "Scheduled job");
        let mut state = self.state.lock();
        state.jobs.push(job.clone());
        if let Some(shutdown) = state.running.clone() {
            state.started += 1;
            run_job(bot.clone(), job, shutdown);
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Scheduler")
            .field("jobs", &state.jobs.len())
            .field("running", &state.running.is_some())
            .finish()
    }
}

fn run_job(bot: Bot, job: ScheduledJob, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: DateTime<Utc> = Utc::now();
        loop {
            let Some(next) = job.schedule.after(&last).next() else {
                warn!(job = %job.name, "Schedule has no upcoming fire time");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(job = %job.name, "Scheduled job stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            last = next;
            debug!(job = %job.name, at = %next, "Running scheduled job");
            spawn_guarded(&bot, job.name.clone(), None, job.job.call(bot.clone()));
        }
    })
}

/// Builder returned by [`Bot::on_schedule`].
pub struct ScheduleBuilder<'a> {
    bot: &'a Bot,
    expression: String,
    name: Option<String>,
}

impl Bot {
    /// Starts registering a job for a cron schedule.
    ///
    /// Accepts a [`CronFields`] or a six-field expression string.
    pub fn on_schedule(&self, schedule: impl ToString) -> ScheduleBuilder<'_> {
        ScheduleBuilder {
            bot: self,
            expression: schedule.to_string(),
            name: None,
        }
    }
}

impl ScheduleBuilder<'_> {
    /// Names the job in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers `f` to run on the schedule.
    ///
    /// Fails if the expression does not parse.
    pub fn handle<F, Fut>(self, f: F) -> FrameworkResult<()>
    where
        F: Fn(Bot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let schedule =
            Schedule::from_str(&self.expression).map_err(|e| FrameworkError::InvalidSchedule {
                expression: self.expression.clone(),
                reason: e.to_string(),
            })?;
        let name = self
            .name
            .unwrap_or_else(|| format!("schedule {}", self.expression));

        self.bot.scheduler().add(
            self.bot,
            ScheduledJob {
                name,
                schedule,
                job: into_job(f),
            },
        );
        Ok(())
    }
}
