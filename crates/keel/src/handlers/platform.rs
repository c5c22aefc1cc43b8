//! Platform handler reporting the current process.

use std::env;

use keel_core::{Handler, Provides};

use crate::interfaces::platform::{PlatformHandler, CAPABILITIES};

#[derive(Debug, Clone)]
pub struct KeelPlatformHandler {
    platform: String,
    host: String,
    pid: u32,
}

impl KeelPlatformHandler {
    pub fn new() -> Self {
        Self {
            platform: format!("{}-{}", env::consts::OS, env::consts::ARCH),
            host: hostname(),
            pid: std::process::id(),
        }
    }
}

impl Default for KeelPlatformHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Provides for KeelPlatformHandler {
    const LABEL: &'static str = "keel";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;
}

impl Handler for KeelPlatformHandler {}

impl PlatformHandler for KeelPlatformHandler {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn pid(&self) -> u32 {
        self.pid
    }
}
