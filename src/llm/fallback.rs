//! Deterministic fallback responder
//!
//! Used whenever the generative model is unavailable or fails: a fixed
//! keyword-matched canned reply, so a chat turn always produces an answer.

/// Produce a canned reply for the user's message
pub fn heuristic_reply(message: &str) -> String {
    let reply = if message.contains("رحلة") {
        "يمكنك الاطلاع على تفاصيل الرحلات في المعلومات المسترجعة."
    } else if message.contains("سياسة") || message.contains("إلغاء") {
        "هذه هي سياسات الإلغاء المتاحة."
    } else if message.contains("مسار") {
        "هذه هي المسارات المتاحة مع نقاط التوقف."
    } else {
        "هذه هي المعلومات المتوفرة حول استفسارك."
    };
    reply.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_replies() {
        assert_eq!(
            heuristic_reply("هل توجد رحلة غداً؟"),
            "يمكنك الاطلاع على تفاصيل الرحلات في المعلومات المسترجعة."
        );
        assert_eq!(
            heuristic_reply("ما هي سياسة الاسترداد؟"),
            "هذه هي سياسات الإلغاء المتاحة."
        );
        assert_eq!(
            heuristic_reply("أريد إلغاء الحجز"),
            "هذه هي سياسات الإلغاء المتاحة."
        );
        assert_eq!(
            heuristic_reply("ما هو مسار الدمام؟"),
            "هذه هي المسارات المتاحة مع نقاط التوقف."
        );
    }

    #[test]
    fn test_generic_reply_is_deterministic() {
        let first = heuristic_reply("متى تفتحون؟");
        let second = heuristic_reply("متى تفتحون؟");
        assert_eq!(first, "هذه هي المعلومات المتوفرة حول استفسارك.");
        assert_eq!(first, second);
    }
}
