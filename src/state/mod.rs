//! State Module - Values that outlive a single frame.
//!
//! - **Signal** - typed value holder, delivery wrappers (deferred, throttled, one-shot)
//! - **Out** - write-once slot a child fills for its creator
//! - **ReactiveList** - owned list that emits its snapshot on every change
//! - **Resources** - app-level type-keyed singletons with observers
//! - **Time** - scaled frame clocks, timers and the `Clock` component

mod out;
mod reactive_list;
mod resources;
mod signal;
mod time;

pub use out::Out;
pub use reactive_list::ReactiveList;
pub use resources::{ResourceObserver, Resources};
pub use signal::{Deferred, OneShot, Signal, SignalTarget, TargetExt, TargetId, Throttled};
pub use time::{Clock, FrameTime, TimeExt, Timer};
