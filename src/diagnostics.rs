//! A `Diagnostics` service reporting the health of the process and what the router serves.
//!
//! ```rust
//! use typed_rpc::{diagnostics, Router};
//!
//! let router = diagnostics::mount(Router::new()).unwrap().build();
//! assert!(router.get("Diagnostics.Status").is_some());
//! ```

use std::{
    sync::{Arc, OnceLock},
    thread,
};

use serde::{Deserialize, Serialize};
use sysinfo::{ProcessesToUpdate, System};

use crate::{
    BuiltRouter, Error, ErrorCode, HttpVerb, MethodKind, Reflect, Router, RouterError,
};

pub const SERVICE: &str = "Diagnostics";

/// Memory counters in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    /// Resident memory of this process, when the platform reports it.
    pub process: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct RuntimeInfo {
    /// Tasks alive on the current tokio runtime. `None` outside of a runtime.
    pub tasks: Option<usize>,
    pub cpus: usize,
    pub memory: MemoryStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct MethodInfo {
    pub key: String,
    pub name: String,
    pub kind: MethodKind,
    pub verb: HttpVerb,
    pub request: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct ServiceInfo {
    pub name: String,
    pub methods: Vec<MethodInfo>,
}

/// Every method served by the router, grouped by service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct Status {
    pub services: Vec<ServiceInfo>,
}

impl Status {
    pub fn of(router: &BuiltRouter) -> Self {
        Self {
            services: router
                .services()
                .into_iter()
                .map(|(name, methods)| ServiceInfo {
                    name: name.to_string(),
                    methods: methods
                        .into_iter()
                        .map(|method| MethodInfo {
                            key: method.key(),
                            name: method.method().to_string(),
                            kind: method.kind(),
                            verb: method.verb(),
                            request: method.request().to_string(),
                            response: method.response().to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl RuntimeInfo {
    pub fn collect() -> Self {
        let tasks = tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| handle.metrics().num_alive_tasks());
        let cpus = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            tasks,
            cpus,
            memory: MemoryStats::collect(),
        }
    }
}

impl MemoryStats {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let process = sysinfo::get_current_pid().ok().and_then(|pid| {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|process| process.memory())
        });

        Self {
            total: sys.total_memory(),
            used: sys.used_memory(),
            available: sys.available_memory(),
            process,
        }
    }
}

/// Register the `Diagnostics` service with `Health`, `RuntimeInfo` and `Status`.
///
/// `Status` describes the router as it is when [`Router::build`] is called, so it includes
/// methods registered after this.
pub fn mount(router: Router) -> Result<Router, RouterError> {
    let status = Arc::new(OnceLock::<Status>::new());

    router
        .unary_with(SERVICE, "Health", HttpVerb::Get, |_: ()| async { Ok(true) })?
        .unary_with(SERVICE, "RuntimeInfo", HttpVerb::Get, |_: ()| async {
            Ok(RuntimeInfo::collect())
        })?
        .unary_with(SERVICE, "Status", HttpVerb::Get, {
            let status = status.clone();
            move |_: ()| {
                let status = status.get().cloned();
                async move {
                    status.ok_or_else(|| {
                        Error::new(ErrorCode::Unavailable, "the router has not been built")
                    })
                }
            }
        })
        .map(|router| {
            router.on_build(move |built| {
                let _ = status.set(Status::of(built));
            })
        })
}
