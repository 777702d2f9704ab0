//! Authorization engine.
//!
//! Every privileged operation is described as an [`Action`] and decided by
//! [`authorize`], a pure function of the acting user and the action's target.
//! Handlers load the actor and target from the store, ask for a decision and
//! translate a [`Denial`] into its fixed response.
//!
//! | Action            | Allowed                    | Denied when                                              |
//! |-------------------|----------------------------|----------------------------------------------------------|
//! | `Manage`          | ADMIN, STAFF               | any other role or no role                                |
//! | `AssignRole`      | ADMIN, STAFF               | role is ADMIN; ADMIN on self; STAFF on a user with a role or assigning non-CLIENT |
//! | `AssignCompany`   | ADMIN, STAFF               | target has no role; target is ADMIN; STAFF on STAFF or self |
//! | `RemoveCompany`   | ADMIN, STAFF               | company is the default company                           |
//! | `RemoveUser`      | ADMIN, STAFF               | ADMIN on ADMIN (incl. self); STAFF on STAFF, self or ADMIN |
//! | `ViewCompany`     | ADMIN, STAFF, member CLIENT | no role; CLIENT of another company                      |
//! | `DeletePrivateLink` | CLIENT                   | any other role (no ownership check)                      |

use service_core::error::AppError;

use crate::models::RoleName;

/// The user performing an action, as currently stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: i64,
    pub role: Option<RoleName>,
    pub company_id: Option<i64>,
}

/// The user an action is aimed at.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub role: Option<RoleName>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action<'a> {
    /// Management surface gate: company CRUD, reward vault, links, listings.
    Manage,
    AssignRole { role: RoleName, target: &'a Subject },
    AssignCompany { target: &'a Subject },
    RemoveCompany { is_default: bool },
    RemoveUser { target: &'a Subject },
    ViewCompany { company_id: i64 },
    DeletePrivateLink,
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Manage => "manage",
            Action::AssignRole { .. } => "assign_role",
            Action::AssignCompany { .. } => "assign_company",
            Action::RemoveCompany { .. } => "remove_company",
            Action::RemoveUser { .. } => "remove_user",
            Action::ViewCompany { .. } => "view_company",
            Action::DeletePrivateLink => "delete_private_link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotPrivileged,
    AdminRoleNotAssignable,
    AdminOwnRole,
    StaffTargetHasRole,
    StaffAssignsNonClient,
    CannotAssignRoles,
    TargetHasNoRole,
    AdminCompanyFixed,
    StaffCompanyClientsOnly,
    DefaultCompany,
    AdminRemovesAdmin,
    StaffRemovesStaffOrSelf,
    StaffRemovesAdmin,
    NoViewPrivilege,
    OtherCompany,
    LinkPermission,
}

/// How a denial is reported over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    Forbidden,
    NotFound,
    BadRequest,
}

impl Denial {
    pub fn message(&self) -> &'static str {
        match self {
            Denial::NotPrivileged => "You don't have permission to perform this action.",
            Denial::AdminRoleNotAssignable => "You can't assign Admin role.",
            Denial::AdminOwnRole => "Admin cannot modify their own role.",
            Denial::StaffTargetHasRole => "STAFF can only modify users with no existing role.",
            Denial::StaffAssignsNonClient => "STAFF can only assign the CLIENT role.",
            Denial::CannotAssignRoles => "You don't have permission to assign roles.",
            Denial::TargetHasNoRole => "User does not have a role.",
            Denial::AdminCompanyFixed => "You cannot change the company of an ADMIN.",
            Denial::StaffCompanyClientsOnly => "Staff can only change the company for Clients.",
            Denial::DefaultCompany => "Default company cannot be removed.",
            Denial::AdminRemovesAdmin => "Admin cannot delete themselves.",
            Denial::StaffRemovesStaffOrSelf => "Staff cannot delete themselves or other staff.",
            Denial::StaffRemovesAdmin => "Staff cannot delete an admin.",
            Denial::NoViewPrivilege => "You do not have the privilege to view this company.",
            Denial::OtherCompany => "You are not authorized to view this company.",
            Denial::LinkPermission => "Permission denied.",
        }
    }

    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::TargetHasNoRole => DenialKind::NotFound,
            Denial::DefaultCompany => DenialKind::BadRequest,
            _ => DenialKind::Forbidden,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        let message = denial.message().to_string();
        match denial.kind() {
            DenialKind::Forbidden => AppError::Forbidden(message),
            DenialKind::NotFound => AppError::NotFound(message),
            DenialKind::BadRequest => AppError::BadRequest(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

fn deny(denial: Denial) -> Decision {
    Decision::Deny(denial)
}

pub fn authorize(actor: &Actor, action: Action<'_>) -> Decision {
    use RoleName::{Admin, Client, Staff};

    match action {
        Action::Manage => match actor.role {
            Some(role) if role.is_privileged() => Decision::Allow,
            _ => deny(Denial::NotPrivileged),
        },

        Action::AssignRole { role, target } => {
            if role == Admin {
                return deny(Denial::AdminRoleNotAssignable);
            }
            match actor.role {
                Some(Admin) if target.id == actor.id => deny(Denial::AdminOwnRole),
                Some(Admin) => Decision::Allow,
                Some(Staff) if target.role.is_some() => deny(Denial::StaffTargetHasRole),
                Some(Staff) if role != Client => deny(Denial::StaffAssignsNonClient),
                Some(Staff) => Decision::Allow,
                _ => deny(Denial::CannotAssignRoles),
            }
        }

        Action::AssignCompany { target } => {
            if !actor.role.is_some_and(|r| r.is_privileged()) {
                return deny(Denial::NotPrivileged);
            }
            match target.role {
                None => deny(Denial::TargetHasNoRole),
                Some(Admin) => deny(Denial::AdminCompanyFixed),
                Some(Staff) if actor.role == Some(Staff) => deny(Denial::StaffCompanyClientsOnly),
                _ if actor.role == Some(Staff) && target.id == actor.id => {
                    deny(Denial::StaffCompanyClientsOnly)
                }
                _ => Decision::Allow,
            }
        }

        Action::RemoveCompany { is_default } => {
            if !actor.role.is_some_and(|r| r.is_privileged()) {
                deny(Denial::NotPrivileged)
            } else if is_default {
                deny(Denial::DefaultCompany)
            } else {
                Decision::Allow
            }
        }

        Action::RemoveUser { target } => match actor.role {
            Some(Admin) if target.role == Some(Admin) || target.id == actor.id => {
                deny(Denial::AdminRemovesAdmin)
            }
            Some(Admin) => Decision::Allow,
            Some(Staff) if target.role == Some(Staff) || target.id == actor.id => {
                deny(Denial::StaffRemovesStaffOrSelf)
            }
            Some(Staff) if target.role == Some(Admin) => deny(Denial::StaffRemovesAdmin),
            Some(Staff) => Decision::Allow,
            _ => deny(Denial::NotPrivileged),
        },

        Action::ViewCompany { company_id } => match actor.role {
            None => deny(Denial::NoViewPrivilege),
            Some(Client) if actor.company_id != Some(company_id) => deny(Denial::OtherCompany),
            Some(_) => Decision::Allow,
        },

        // TODO: restrict to links of the actor's own company once product confirms ownership rules.
        Action::DeletePrivateLink => match actor.role {
            Some(Client) => Decision::Allow,
            _ => deny(Denial::LinkPermission),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoleName::{Admin, Client, Staff};

    fn actor(id: i64, role: Option<RoleName>) -> Actor {
        Actor {
            id,
            role,
            company_id: None,
        }
    }

    fn subject(id: i64, role: Option<RoleName>) -> Subject {
        Subject { id, role }
    }

    #[test]
    fn test_manage_requires_admin_or_staff() {
        assert_eq!(authorize(&actor(1, Some(Admin)), Action::Manage), Decision::Allow);
        assert_eq!(authorize(&actor(1, Some(Staff)), Action::Manage), Decision::Allow);
        assert_eq!(
            authorize(&actor(1, Some(Client)), Action::Manage),
            Decision::Deny(Denial::NotPrivileged)
        );
        assert_eq!(
            authorize(&actor(1, None), Action::Manage),
            Decision::Deny(Denial::NotPrivileged)
        );
    }

    #[test]
    fn test_nobody_assigns_admin_role() {
        let target = subject(2, None);
        for role in [Some(Admin), Some(Staff), Some(Client), None] {
            assert_eq!(
                authorize(&actor(1, role), Action::AssignRole { role: Admin, target: &target }),
                Decision::Deny(Denial::AdminRoleNotAssignable)
            );
        }
    }

    #[test]
    fn test_admin_role_assignment() {
        let admin = actor(1, Some(Admin));
        let other = subject(2, Some(Client));
        let itself = subject(1, Some(Admin));

        assert_eq!(
            authorize(&admin, Action::AssignRole { role: Staff, target: &other }),
            Decision::Allow
        );
        assert_eq!(
            authorize(&admin, Action::AssignRole { role: Client, target: &itself }),
            Decision::Deny(Denial::AdminOwnRole)
        );
    }

    #[test]
    fn test_staff_role_assignment() {
        let staff = actor(1, Some(Staff));
        let fresh = subject(2, None);
        let client = subject(3, Some(Client));
        let itself = subject(1, Some(Staff));

        assert_eq!(
            authorize(&staff, Action::AssignRole { role: Client, target: &fresh }),
            Decision::Allow
        );
        assert_eq!(
            authorize(&staff, Action::AssignRole { role: Staff, target: &fresh }),
            Decision::Deny(Denial::StaffAssignsNonClient)
        );
        assert_eq!(
            authorize(&staff, Action::AssignRole { role: Client, target: &client }),
            Decision::Deny(Denial::StaffTargetHasRole)
        );
        assert_eq!(
            authorize(&staff, Action::AssignRole { role: Client, target: &itself }),
            Decision::Deny(Denial::StaffTargetHasRole)
        );
    }

    #[test]
    fn test_client_cannot_assign_roles() {
        let target = subject(2, None);
        assert_eq!(
            authorize(&actor(1, Some(Client)), Action::AssignRole { role: Client, target: &target }),
            Decision::Deny(Denial::CannotAssignRoles)
        );
    }

    #[test]
    fn test_company_assignment() {
        let admin = actor(1, Some(Admin));
        let staff = actor(2, Some(Staff));

        let roleless = subject(3, None);
        let an_admin = subject(4, Some(Admin));
        let a_staff = subject(5, Some(Staff));
        let a_client = subject(6, Some(Client));
        let staff_self = subject(2, Some(Staff));

        assert_eq!(
            authorize(&admin, Action::AssignCompany { target: &roleless }),
            Decision::Deny(Denial::TargetHasNoRole)
        );
        assert_eq!(
            authorize(&admin, Action::AssignCompany { target: &an_admin }),
            Decision::Deny(Denial::AdminCompanyFixed)
        );
        assert_eq!(authorize(&admin, Action::AssignCompany { target: &a_staff }), Decision::Allow);
        assert_eq!(
            authorize(&staff, Action::AssignCompany { target: &a_staff }),
            Decision::Deny(Denial::StaffCompanyClientsOnly)
        );
        assert_eq!(
            authorize(&staff, Action::AssignCompany { target: &staff_self }),
            Decision::Deny(Denial::StaffCompanyClientsOnly)
        );
        assert_eq!(authorize(&staff, Action::AssignCompany { target: &a_client }), Decision::Allow);
    }

    #[test]
    fn test_default_company_is_never_removable() {
        for role in [Admin, Staff] {
            assert_eq!(
                authorize(&actor(1, Some(role)), Action::RemoveCompany { is_default: true }),
                Decision::Deny(Denial::DefaultCompany)
            );
            assert_eq!(
                authorize(&actor(1, Some(role)), Action::RemoveCompany { is_default: false }),
                Decision::Allow
            );
        }
    }

    #[test]
    fn test_user_removal() {
        let admin = actor(1, Some(Admin));
        let staff = actor(2, Some(Staff));

        let other_admin = subject(3, Some(Admin));
        let other_staff = subject(4, Some(Staff));
        let client = subject(5, Some(Client));
        let roleless = subject(6, None);

        assert_eq!(
            authorize(&admin, Action::RemoveUser { target: &other_admin }),
            Decision::Deny(Denial::AdminRemovesAdmin)
        );
        assert_eq!(
            authorize(&admin, Action::RemoveUser { target: &subject(1, Some(Admin)) }),
            Decision::Deny(Denial::AdminRemovesAdmin)
        );
        assert_eq!(authorize(&admin, Action::RemoveUser { target: &other_staff }), Decision::Allow);
        assert_eq!(authorize(&admin, Action::RemoveUser { target: &roleless }), Decision::Allow);

        assert_eq!(
            authorize(&staff, Action::RemoveUser { target: &other_staff }),
            Decision::Deny(Denial::StaffRemovesStaffOrSelf)
        );
        assert_eq!(
            authorize(&staff, Action::RemoveUser { target: &subject(2, Some(Staff)) }),
            Decision::Deny(Denial::StaffRemovesStaffOrSelf)
        );
        assert_eq!(
            authorize(&staff, Action::RemoveUser { target: &other_admin }),
            Decision::Deny(Denial::StaffRemovesAdmin)
        );
        assert_eq!(authorize(&staff, Action::RemoveUser { target: &client }), Decision::Allow);
        assert_eq!(authorize(&staff, Action::RemoveUser { target: &roleless }), Decision::Allow);
    }

    #[test]
    fn test_company_view() {
        let member = Actor {
            id: 1,
            role: Some(Client),
            company_id: Some(10),
        };
        assert_eq!(authorize(&member, Action::ViewCompany { company_id: 10 }), Decision::Allow);
        assert_eq!(
            authorize(&member, Action::ViewCompany { company_id: 11 }),
            Decision::Deny(Denial::OtherCompany)
        );

        let unassigned = actor(2, Some(Client));
        assert_eq!(
            authorize(&unassigned, Action::ViewCompany { company_id: 10 }),
            Decision::Deny(Denial::OtherCompany)
        );
        assert_eq!(
            authorize(&actor(3, None), Action::ViewCompany { company_id: 10 }),
            Decision::Deny(Denial::NoViewPrivilege)
        );
        assert_eq!(
            authorize(&actor(4, Some(Staff)), Action::ViewCompany { company_id: 99 }),
            Decision::Allow
        );
    }

    #[test]
    fn test_only_clients_delete_links() {
        assert_eq!(authorize(&actor(1, Some(Client)), Action::DeletePrivateLink), Decision::Allow);
        for role in [Some(Admin), Some(Staff), None] {
            assert_eq!(
                authorize(&actor(1, role), Action::DeletePrivateLink),
                Decision::Deny(Denial::LinkPermission)
            );
        }
    }

    #[test]
    fn test_denial_kinds() {
        assert_eq!(Denial::TargetHasNoRole.kind(), DenialKind::NotFound);
        assert_eq!(Denial::DefaultCompany.kind(), DenialKind::BadRequest);
        assert_eq!(Denial::StaffRemovesAdmin.kind(), DenialKind::Forbidden);
    }
}
