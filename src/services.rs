pub mod counting_service;
pub use counting_service::CountingService;
pub mod reconciliation_service;
pub use reconciliation_service::ReconciliationService;

#[cfg(test)]
pub(crate) mod test_support;
