//! Timer source

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{StreamError, StreamResult};
use crate::pull_loop::PullLoop;
use crate::pull_stream::{PullStream, Source};
use crate::queue::Controller;

struct IntervalSource {
    period: Duration,
    timer: Option<PullLoop>,
}

impl Source<DateTime<Utc>> for IntervalSource {
    fn start(&mut self, controller: Controller<DateTime<Utc>>) -> StreamResult<()> {
        if self.period.is_zero() {
            return Err(StreamError::registration(
                "interval timer",
                "period must be greater than zero",
            ));
        }

        let period = self.period;
        let output = controller.clone();
        self.timer = Some(PullLoop::spawn(
            "interval",
            &controller,
            Vec::new(),
            tick(period, output),
        )?);
        log::debug!("interval: timer started, period {:?}", period);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
            log::debug!("interval: timer cleared");
        }
    }
}

async fn tick(period: Duration, output: Controller<DateTime<Utc>>) -> StreamResult<()> {
    let mut ticker = interval_at(Instant::now() + period, period);
    // A full queue holds the timer back; late ticks shift the schedule rather
    // than firing in a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        output.send(Utc::now()).await?;
    }
}

/// Stream of timestamps, one per `period`, starting one period after the
/// first read
pub fn interval(period: Duration) -> PullStream<DateTime<Utc>> {
    PullStream::new(IntervalSource {
        period,
        timer: None,
    })
    .with_label("interval")
}
