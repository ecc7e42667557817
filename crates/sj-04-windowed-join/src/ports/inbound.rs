//! # Inbound Port - WindowedJoinApi
//!
//! Driving port used by join workers. A worker owns one implementation per
//! key shard; nothing else touches its buffers.

use shared_types::Event;

use crate::domain::{BufferStats, JoinOutcome, JoinSide, JoinStats, Joiner, WindowedJoin};

pub trait WindowedJoinApi<L, R>: Send {
    type Output;

    /// Probe the right buffer, then buffer the event on the left.
    fn on_left(&mut self, event: Event<L>) -> JoinOutcome<Self::Output>;

    /// Probe the left buffer, then buffer the event on the right.
    fn on_right(&mut self, event: Event<R>) -> JoinOutcome<Self::Output>;

    /// Entries currently buffered on `side`.
    fn buffered(&self, side: JoinSide) -> usize;

    fn buffer_stats(&self, side: JoinSide) -> BufferStats;

    fn stats(&self) -> JoinStats;

    /// Release both buffers. Returns the number of entries dropped.
    fn shutdown(&mut self) -> usize;
}

impl<L, R, J> WindowedJoinApi<L, R> for WindowedJoin<L, R, J>
where
    L: Send,
    R: Send,
    J: Joiner<L, R>,
{
    type Output = J::Output;

    fn on_left(&mut self, event: Event<L>) -> JoinOutcome<J::Output> {
        WindowedJoin::on_left(self, event)
    }

    fn on_right(&mut self, event: Event<R>) -> JoinOutcome<J::Output> {
        WindowedJoin::on_right(self, event)
    }

    fn buffered(&self, side: JoinSide) -> usize {
        match side {
            JoinSide::Left => self.left_len(),
            JoinSide::Right => self.right_len(),
        }
    }

    fn buffer_stats(&self, side: JoinSide) -> BufferStats {
        WindowedJoin::buffer_stats(self, side)
    }

    fn stats(&self) -> JoinStats {
        WindowedJoin::stats(self)
    }

    fn shutdown(&mut self) -> usize {
        self.clear()
    }
}
