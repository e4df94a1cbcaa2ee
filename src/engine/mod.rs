mod decisions;
mod duplicates;
mod options;
mod reconciliation;
mod report;
#[cfg(test)]
mod tests;
mod transfer;
mod transfer_engine;

pub use options::RunOptions;
pub use report::RunReport;
pub use transfer_engine::TransferEngine;
