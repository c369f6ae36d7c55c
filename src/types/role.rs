use super::code_enum;

code_enum! {
    /// Global account role. Grants route-level access only; authority over a
    /// specific group comes from [`MemberRole`].
    pub enum Role {
        Admin => "ADMIN",
        Teacher => "TEACHER",
        Student => "STUDENT",
    }
}

code_enum! {
    /// A member's role inside one group, independent of their global role.
    pub enum MemberRole {
        Admin => "ADMIN",
        Teacher => "TEACHER",
        Student => "STUDENT",
    }
}

impl Role {
    const fn rank(self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Teacher => 1,
            Role::Student => 2,
        }
    }

    /// Highest-privilege role held, or STUDENT when none are assigned.
    #[must_use]
    pub fn primary(roles: &[Role]) -> Role {
        roles
            .iter()
            .copied()
            .min_by_key(|r| r.rank())
            .unwrap_or(Role::Student)
    }

    /// The in-group role a holder of this global role gets in its SYSTEM group.
    #[must_use]
    pub const fn member_role(self) -> MemberRole {
        match self {
            Role::Admin => MemberRole::Admin,
            Role::Teacher => MemberRole::Teacher,
            Role::Student => MemberRole::Student,
        }
    }
}
