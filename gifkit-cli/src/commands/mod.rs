//! CLI subcommand implementations.

pub mod assemble;
pub mod explode;
pub mod info;

pub use assemble::CmdAssemble;
pub use explode::CmdExplode;
pub use info::CmdInfo;
