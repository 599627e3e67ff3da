/// The schedule route has no backing feature yet.
pub const SCHEDULE_PLACEHOLDER: &str = "Funcionalidade de agenda em breve!";
