use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Logical input streams of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputStream {
    /// Free-text name typing.
    Name,
    /// Discrete estimate selection.
    Value,
}

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Per-stream trailing-edge debouncer.
///
/// Each `push` replaces the pending value of its stream and re-arms that
/// stream's deadline; streams never delay each other. A stream without a
/// configured delay fires on the next poll. Time is passed in explicitly so the
/// driver can use any clock.
#[derive(Debug, Clone)]
pub struct Debouncer<S, V> {
    delays: HashMap<S, Duration>,
    pending: HashMap<S, Pending<V>>,
}

impl<S, V> Default for Debouncer<S, V>
where
    S: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, V> Debouncer<S, V>
where
    S: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            delays: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn with_delay(mut self, stream: S, delay: Duration) -> Self {
        self.delays.insert(stream, delay);
        self
    }

    pub fn delay(&self, stream: S) -> Duration {
        self.delays.get(&stream).copied().unwrap_or(Duration::ZERO)
    }

    pub fn push(&mut self, stream: S, value: V, now: Instant) {
        let deadline = now + self.delay(stream);
        self.pending.insert(stream, Pending { value, deadline });
    }

    pub fn is_pending(&self, stream: S) -> bool {
        self.pending.contains_key(&stream)
    }

    /// Drop a pending value without sending it.
    pub fn cancel(&mut self, stream: S) -> Option<V> {
        self.pending.remove(&stream).map(|p| p.value)
    }

    /// Earliest deadline among pending streams.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Take every value whose quiet period has elapsed, earliest first.
    pub fn poll_ready(&mut self, now: Instant) -> Vec<(S, V)> {
        let due: Vec<S> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(s, _)| *s)
            .collect();
        self.take_sorted(due)
    }

    /// Take everything still pending regardless of deadlines.
    pub fn flush(&mut self) -> Vec<(S, V)> {
        let all: Vec<S> = self.pending.keys().copied().collect();
        self.take_sorted(all)
    }

    fn take_sorted(&mut self, streams: Vec<S>) -> Vec<(S, V)> {
        let mut out: Vec<(Instant, S, V)> = streams
            .into_iter()
            .filter_map(|s| self.pending.remove(&s).map(|p| (p.deadline, s, p.value)))
            .collect();
        out.sort_by_key(|(deadline, _, _)| *deadline);
        out.into_iter().map(|(_, s, v)| (s, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn debouncer() -> Debouncer<InputStream, String> {
        Debouncer::new()
            .with_delay(InputStream::Name, ms(250))
            .with_delay(InputStream::Value, Duration::ZERO)
    }

    #[test]
    fn test_burst_coalesces_to_last_value() {
        let t0 = Instant::now();
        let mut d = debouncer();
        d.push(InputStream::Name, "A".to_string(), t0);
        d.push(InputStream::Name, "An".to_string(), t0 + ms(100));
        d.push(InputStream::Name, "Ann".to_string(), t0 + ms(200));

        // 250ms after the first edit but not after the last.
        assert!(d.poll_ready(t0 + ms(300)).is_empty());
        assert_eq!(d.next_deadline(), Some(t0 + ms(450)));

        let fired = d.poll_ready(t0 + ms(450));
        assert_eq!(fired, vec![(InputStream::Name, "Ann".to_string())]);
        assert!(d.poll_ready(t0 + ms(1000)).is_empty());
        assert!(d.next_deadline().is_none());
    }

    #[test]
    fn test_zero_delay_fires_immediately() {
        let t0 = Instant::now();
        let mut d = debouncer();
        d.push(InputStream::Value, "5".to_string(), t0);
        assert_eq!(
            d.poll_ready(t0),
            vec![(InputStream::Value, "5".to_string())]
        );
    }

    #[test]
    fn test_streams_are_independent() {
        let t0 = Instant::now();
        let mut d = debouncer();
        d.push(InputStream::Name, "Bo".to_string(), t0);
        d.push(InputStream::Value, "3".to_string(), t0 + ms(10));

        let fired = d.poll_ready(t0 + ms(10));
        assert_eq!(fired, vec![(InputStream::Value, "3".to_string())]);
        assert!(d.is_pending(InputStream::Name));
    }

    #[test]
    fn test_flush_orders_by_deadline() {
        let t0 = Instant::now();
        let mut d = debouncer();
        d.push(InputStream::Name, "Cy".to_string(), t0);
        d.push(InputStream::Value, "8".to_string(), t0 + ms(5));
        let all = d.flush();
        assert_eq!(all[0].0, InputStream::Value);
        assert_eq!(all[1].0, InputStream::Name);
        assert!(d.next_deadline().is_none());
    }

    #[test]
    fn test_cancel_drops_pending_value() {
        let t0 = Instant::now();
        let mut d = debouncer();
        d.push(InputStream::Name, "x".to_string(), t0);
        assert_eq!(d.cancel(InputStream::Name), Some("x".to_string()));
        assert!(d.poll_ready(t0 + ms(500)).is_empty());
    }
}
