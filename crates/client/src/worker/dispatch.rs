//! Maps a request category and the configured strategy to the algorithm
//! that answers it, and to what happens when that algorithm gets nothing.

use pwa_core::Strategy;

use super::classify::Category;

/// The four cache algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    StaleWhileRevalidate,
    NetworkFirst,
    CacheFirst,
    NetworkOnly,
}

impl From<Strategy> for Plan {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::StaleWhileRevalidate => Plan::StaleWhileRevalidate,
            Strategy::NetworkFirst => Plan::NetworkFirst,
            Strategy::CacheFirst => Plan::CacheFirst,
            Strategy::NetworkOnly => Plan::NetworkOnly,
        }
    }
}

/// Terminal fallback when a plan produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    OfflinePage,
    OfflineImage,
    /// Nothing sensible to substitute; answer with a network error.
    NetworkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub plan: Plan,
    pub fallback: Fallback,
}

/// Route a classified request.
///
/// Returns `None` for excluded requests, which the worker never handles.
pub fn route(category: Category, strategy: Strategy, saves_data: bool) -> Option<Route> {
    let route = match category {
        Category::Excluded => return None,
        Category::StaticAsset => Route { plan: Plan::StaleWhileRevalidate, fallback: Fallback::NetworkError },
        Category::Image if saves_data => Route { plan: Plan::NetworkOnly, fallback: Fallback::OfflineImage },
        Category::Image => Route { plan: Plan::StaleWhileRevalidate, fallback: Fallback::NetworkError },
        Category::Other => Route { plan: strategy.into(), fallback: Fallback::OfflinePage },
    };
    Some(route)
}
