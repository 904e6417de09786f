//! User account status.

define_text_enum! {
    UserStatus {
        Active => "active",
        Blocked => "blocked",
        Deactivated => "deactivated",
        Deleted => "deleted",
    }
}

impl UserStatus {
    /// Only active accounts may sign in.
    pub fn can_login(self) -> bool {
        self == UserStatus::Active
    }

    /// Statuses an administrator may set directly. `deleted` is reached only
    /// through the delete endpoint.
    pub fn is_admin_settable(self) -> bool {
        matches!(
            self,
            UserStatus::Active | UserStatus::Blocked | UserStatus::Deactivated
        )
    }
}
