pub mod cards;
pub mod command;
pub mod events;
pub mod invoker;
pub mod locate;
pub mod results;
pub mod session;

mod traits;

pub use command::{render_launch_script, render_output_script};
pub use invoker::{CapturingSink, Invocation, ProcessInvoker, StdoutSink, TracingSink};
pub use locate::SearchPathLocator;
pub use results::parse_run_result;
pub use traits::{ExecutableLocator, OutputSink, OverwritePolicy, ScriptRunner};
