use crate::formatter::format_content;
use std::future::Future;
use std::time::Duration;

/// Anything that can display a formatted message body while it grows.
pub trait RenderTarget {
    /// Replaces the rendered body of the message currently being revealed.
    fn replace_html(&mut self, html: &str);

    /// Keeps the newest content in view. No-op for targets without scrolling.
    fn pin_to_bottom(&mut self) {}
}

/// Source of the delay between reveal steps.
pub trait Pacer {
    fn pause(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Presents an answer one line at a time, re-formatting the growing prefix on
/// every step so partial markup still renders sensibly.
pub struct RevealAnimator<P> {
    pacer: P,
    step: Duration,
}

impl<P: Pacer> RevealAnimator<P> {
    pub fn new(pacer: P, lines_per_second: u32) -> Self {
        let rate = u64::from(lines_per_second.max(1));
        Self {
            pacer,
            step: Duration::from_millis(1000 / rate),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Reveals `full_text` into `target`. The last frame always equals the
    /// formatted full text.
    pub async fn reveal<T>(&self, target: &mut T, full_text: &str)
    where
        T: RenderTarget + ?Sized,
    {
        let lines: Vec<&str> = full_text.split('\n').collect();
        let last = lines.len().saturating_sub(1);

        for shown in 0..lines.len() {
            let partial = lines[..=shown].join("\n");
            target.replace_html(&format_content(&partial));
            target.pin_to_bottom();
            if shown < last {
                self.pacer.pause(self.step).await;
            }
        }

        target.replace_html(&format_content(full_text));
        target.pin_to_bottom();
    }
}
