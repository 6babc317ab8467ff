/// Monotonic millisecond counter supplied by the platform.
///
/// embedded-hal only covers blocking delays, so the driver needs this to
/// enforce the minimum interval between reads. The counter may wrap; the driver
/// only ever looks at wrapping differences.
pub trait Clock {
    /// Milliseconds since some fixed point, usually boot.
    fn now_ms(&mut self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}
