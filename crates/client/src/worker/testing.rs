//! In-process fakes for the network and the host registration.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use pwa_core::{Headers, Request, RequestMode, Response, ResponseKind};
use url::Url;

use super::liveness::Registration;
use crate::fetch::{FetchOptions, Network, NetworkError};

#[derive(Clone)]
enum Script {
    Status { status: u16, body: Bytes },
    /// Opaque in `NoCors` mode, a readable 200 otherwise.
    CrossOrigin { body: Bytes },
    /// Opaque whatever the mode.
    AlwaysOpaque { body: Bytes },
}

/// A [`Network`] answering from a table of scripted URLs.
///
/// Unscripted URLs fail with a connection error.
#[derive(Default)]
pub struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, url: &str, script: Script) {
        let key = Url::parse(url).expect("scripted URL parses").to_string();
        self.scripts.lock().unwrap().insert(key, script);
    }

    pub fn respond(&self, url: &str, status: u16, body: &'static str) {
        self.script(url, Script::Status { status, body: Bytes::from_static(body.as_bytes()) });
    }

    pub fn respond_cross_origin(&self, url: &str, body: &'static str) {
        self.script(url, Script::CrossOrigin { body: Bytes::from_static(body.as_bytes()) });
    }

    pub fn respond_opaque(&self, url: &str, body: &'static str) {
        self.script(url, Script::AlwaysOpaque { body: Bytes::from_static(body.as_bytes()) });
    }

    /// Take a URL offline.
    pub fn fail(&self, url: &str) {
        let key = Url::parse(url).expect("scripted URL parses").to_string();
        self.scripts.lock().unwrap().remove(&key);
    }

    pub fn go_offline(&self) {
        self.scripts.lock().unwrap().clear();
    }

    pub fn calls_to(&self, url: &str) -> usize {
        let key = Url::parse(url).expect("URL parses").to_string();
        self.calls.lock().unwrap().iter().filter(|(u, _)| *u == key).count()
    }

    pub fn options_for(&self, url: &str) -> Vec<FetchOptions> {
        let key = Url::parse(url).expect("URL parses").to_string();
        self.calls.lock().unwrap().iter().filter(|(u, _)| *u == key).map(|(_, o)| *o).collect()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, NetworkError> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push((key.clone(), options));
        tokio::task::yield_now().await;

        let script = self.scripts.lock().unwrap().get(&key).cloned();
        let url = request.url.clone();
        match script {
            None => Err(NetworkError::Connect(format!("{key} unreachable"))),
            Some(Script::Status { status, body }) => {
                Ok(Response::new(url, status, Headers::new(), body, ResponseKind::Basic))
            }
            Some(Script::CrossOrigin { body }) => match options.mode {
                RequestMode::NoCors => Ok(Response::opaque(url, body)),
                RequestMode::Cors => Ok(Response::new(url, 200, Headers::new(), body, ResponseKind::Cors)),
            },
            Some(Script::AlwaysOpaque { body }) => Ok(Response::opaque(url, body)),
        }
    }
}

/// Counts unregistration attempts.
#[derive(Default)]
pub struct StubRegistration {
    calls: AtomicUsize,
    failing: bool,
}

impl StubRegistration {
    pub fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), failing: true }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registration for StubRegistration {
    async fn unregister(&self) -> Result<bool, pwa_core::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(pwa_core::Error::UnregisterFailed("registration locked".into()));
        }
        Ok(true)
    }
}
