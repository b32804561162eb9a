/// Validation messages surfaced in mutation payloads.
pub const NAME_REQUIRED: &str = "Name is required.";
pub const EMAIL_REQUIRED: &str = "Email is required.";
pub const EMAIL_EXISTS: &str = "Email already exists.";
pub const BATCH_ROLLED_BACK: &str = "Batch rolled back.";
pub const PHONE_INVALID: &str = "Invalid phone format. Use +1234567890 or 123-456-7890.";
pub const PHONE_INVALID_SHORT: &str = "Invalid phone format.";
pub const PRICE_NOT_POSITIVE: &str = "Price must be a positive value.";
pub const PRICE_OUT_OF_RANGE: &str = "Price is out of range.";
pub const STOCK_NEGATIVE: &str = "Stock cannot be negative.";
pub const INVALID_CUSTOMER_ID: &str = "Invalid customer ID.";
pub const NO_PRODUCTS: &str = "At least one product must be selected.";
pub const INVALID_PRODUCT_IDS: &str = "One or more product IDs are invalid.";

pub const CUSTOMER_CREATED: &str = "Customer created successfully.";
pub const CUSTOMER_FAILED: &str = "Failed to create customer.";

pub const HELLO: &str = "Hello, GraphQL!";

// Job identifiers (used by the CLI and the job table)
pub const HEARTBEAT_JOB: &str = "heartbeat";
pub const LOW_STOCK_JOB: &str = "low-stock";
pub const ORDER_REMINDERS_JOB: &str = "order-reminders";
pub const WEEKLY_REPORT_JOB: &str = "weekly-report";

// Cron expressions for self-scheduled jobs
pub const HEARTBEAT_CRON: &str = "*/5 * * * *";
pub const LOW_STOCK_CRON: &str = "0 */12 * * *";
pub const WEEKLY_REPORT_CRON: &str = "0 6 * * 1";

// Default append-only log files, one per job
pub const HEARTBEAT_LOG: &str = "/tmp/crm_heartbeat_log.txt";
pub const LOW_STOCK_LOG: &str = "/tmp/low_stock_updates_log.txt";
pub const ORDER_REMINDERS_LOG: &str = "/tmp/order_reminders_log.txt";
pub const REPORT_LOG: &str = "/tmp/crm_report_log.txt";

/// Timestamp formats written by the jobs.
pub const DMY_TIMESTAMP: &str = "%d/%m/%Y-%H:%M:%S";
pub const YMD_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Get all job identifiers known to the job table
pub fn get_job_ids() -> Vec<&'static str> {
    vec![HEARTBEAT_JOB, LOW_STOCK_JOB, ORDER_REMINDERS_JOB, WEEKLY_REPORT_JOB]
}
