//! Internal messaging vocabulary.

define_text_enum! {
    CommunicationCategory {
        Report => "report",
        Feedback => "feedback",
        Request => "request",
        Alert => "alert",
        Meeting => "meeting",
        General => "general",
    }
}

define_text_enum! {
    CommunicationPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

define_text_enum! {
    CommunicationStatus {
        Draft => "draft",
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
        Responded => "responded",
        Archived => "archived",
    }
}

define_text_enum! {
    /// Which side of the conversation a listing shows.
    Mailbox {
        Inbox => "inbox",
        Sent => "sent",
    }
}

pub const MAX_SUBJECT_LEN: usize = 255;

pub fn validate_message(subject: &str, message: &str) -> Result<(), String> {
    if subject.trim().is_empty() {
        return Err("Subject is required".to_string());
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(format!("Subject must be at most {MAX_SUBJECT_LEN} characters"));
    }
    if message.trim().is_empty() {
        return Err("Message is required".to_string());
    }
    Ok(())
}
