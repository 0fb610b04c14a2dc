mod cancel;
mod scheduler;

pub use cancel::CancellationToken;
pub use scheduler::MelodyScheduler;
