//! ISO 4217 currency code lookup for the configured local currency.

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// Sorted for binary search.
static CURRENCY_CODES: &[&str] = &[
    "AED", // UAE Dirham
    "BHD", // Bahraini Dinar
    "DZD", // Algerian Dinar
    "EGP", // Egyptian Pound
    "EUR", // Euro
    "GBP", // Pound Sterling
    "IQD", // Iraqi Dinar
    "JOD", // Jordanian Dinar
    "KWD", // Kuwaiti Dinar
    "LBP", // Lebanese Pound
    "LYD", // Libyan Dinar
    "MAD", // Moroccan Dirham
    "OMR", // Omani Rial
    "QAR", // Qatari Riyal
    "SAR", // Saudi Riyal
    "SDG", // Sudanese Pound
    "SYP", // Syrian Pound
    "TND", // Tunisian Dinar
    "TRY", // Turkish Lira
    "USD", // US Dollar
    "YER", // Yemeni Rial
];
