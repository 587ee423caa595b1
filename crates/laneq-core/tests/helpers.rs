#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Shared, append-only record of what the operators observed.
#[derive(Debug)]
pub struct Recorder<E>(Arc<Mutex<Vec<E>>>);

impl<E> Clone for Recorder<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: Clone> Recorder<E> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn push(&self, event: E) {
        self.0.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}
