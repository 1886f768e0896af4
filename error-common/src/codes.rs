// Error codes
// Stable identifiers surfaced to the host alongside error messages

pub mod validation {
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const UNDECODABLE_ARGUMENT: &str = "VALIDATION_1003";
}

pub mod catalog {
    pub const LOOKUP_TIMEOUT: &str = "CATALOG_5001";
    pub const LOOKUP_CANCELLED: &str = "CATALOG_5002";
    pub const BACKEND_UNAVAILABLE: &str = "CATALOG_5003";
    pub const TRANSPORT_FAILURE: &str = "CATALOG_5004";
    pub const INVALID_SEED: &str = "CATALOG_5005";
}

pub mod configuration {
    pub const INVALID_CONFIGURATION: &str = "CONFIG_6001";
}

pub mod internal {
    pub const INTERNAL_ERROR: &str = "INTERNAL_9001";
}
