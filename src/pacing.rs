use std::thread;
use std::time::Duration;

pub trait Pacer {
    fn pause(&self);
}

impl<T: Pacer + ?Sized> Pacer for &T {
    fn pause(&self) {
        (**self).pause();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Pacer for FixedDelay {
    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self) {}
}
