mod bootstrap;
mod layout;
mod loop_runner;
mod station;

pub(crate) use loop_runner::run;
