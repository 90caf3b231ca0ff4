mod conn;
mod consume;
mod publish;
mod queue;
