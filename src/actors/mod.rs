//! Actor-based device monitoring
//!
//! Each monitored device gets one [`MonitorActor`](monitor::MonitorActor)
//! running as an independent async task, controlled through a cloneable
//! [`MonitorHandle`](monitor::MonitorHandle).
//!
//! ## Architecture Overview
//!
//! ```text
//!                  +------------------+
//!                  |  netmon (main)   |
//!                  +--------+---------+
//!                           | spawns
//!              +------------+------------+
//!              |                         |
//!      +-------v-------+         +-------v-------+
//!      | MonitorActor  |   ...   | MonitorActor  |
//!      |  (router A)   |         |  (router N)   |
//!      +---+-------+---+         +---+-------+---+
//!          |       |                 |       |
//!          |       +--> tickets <----+       |
//!          |            (storage)            |
//!          +---------+       +---------------+
//!                    |       |
//!              +-----v-------v-----+
//!              |   EventGateway    | (broadcast)
//!              +---------+---------+
//!                        | subscribe
//!              +---------+---------+
//!              |                   |
//!        +-----v------+     +------v------+
//!        | log / push |     |  WebSocket  |
//!        +------------+     +-------------+
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: start, stop and poll-now go over an mpsc channel so the
//!    actor loop is the only place a poll runs
//! 2. **Events**: snapshots, critical issues and poll failures are published
//!    to the broadcast gateway for fan-out
//! 3. **Request/Response**: oneshot channels carry command outcomes back

pub mod messages;
pub mod monitor;

pub use messages::{MonitorStatus, PollOutcome, StartOutcome, StopOutcome};
pub use monitor::{MonitorConfig, MonitorHandle};
