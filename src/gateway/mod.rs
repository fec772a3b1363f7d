//! Exchange-side order entry: the TCP order server and the FIFO
//! sequencer that arbitrates between clients by receive time.

mod fifo_sequencer;
mod order_server;

pub use fifo_sequencer::FifoSequencer;
pub use order_server::OrderServer;
