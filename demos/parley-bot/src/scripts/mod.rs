//! Bundled scripts.

mod coffee;
mod heartbeat;
mod help;
mod lunch;
mod random;

use parley::prelude::{BoxedScript, script};

/// Every bundled script, in load order.
pub fn all() -> Vec<BoxedScript> {
    vec![
        script("help", help::register),
        script("lunch", lunch::register),
        script("random", random::register),
        script("coffee", coffee::register),
        script("heartbeat", heartbeat::register),
    ]
}
