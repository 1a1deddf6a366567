//! SMS segment counting.
//!
//! GSM 7-bit bodies fit 160 characters in a single segment and 153 per
//! segment once concatenated (UDH overhead). Any character outside the GSM
//! alphabet forces UCS-2: 70 single, 67 concatenated.

/// GSM 03.38 basic alphabet, excluding ASCII letters and digits.
const GSM_BASIC: &str = " !\"#$%&'()*+,-./:;<=>?@_\n\r£¥èéùìòÇØøÅåΔΦΓΛΩΠΨΣΘΞÆæßÉ¤¡¿ÄÖÑÜ§äöñüà";

/// Extension table characters (escape-prefixed, still GSM).
const GSM_EXTENSION: &str = "{}[]~\\^|€";

pub fn is_gsm_7bit(c: char) -> bool {
    c.is_ascii_alphanumeric() || GSM_BASIC.contains(c) || GSM_EXTENSION.contains(c)
}

pub fn calculate_segments(body: &str) -> u32 {
    if body.is_empty() {
        return 1;
    }

    let char_count = body.chars().count() as u32;
    let (single, multi) = if body.chars().all(is_gsm_7bit) {
        (160, 153)
    } else {
        (70, 67)
    };

    if char_count <= single {
        1
    } else {
        char_count.div_ceil(multi)
    }
}
