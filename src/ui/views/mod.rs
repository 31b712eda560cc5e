mod dashboard;
mod invoice_detail;
mod invoice_list;
mod profile;
mod upload;

pub use dashboard::DashboardView;
pub use invoice_detail::InvoiceDetailView;
pub use invoice_list::InvoiceListView;
pub use profile::ProfileView;
pub use upload::UploadView;
