/// Resource access policies
///
/// Every authorization decision in OpsDesk comes from [`POLICY_TABLE`], one
/// row per [`Resource`]. Each row names a rule for reads and one for each
/// write operation. Evaluation is pure: it looks at the [`Caller`] and, for
/// record-bound operations, the [`Ownership`] of the freshly loaded row.
///
/// Reads over collections are filtered rather than denied. [`ReadScope`]
/// turns the read rule into a row filter that list queries push into SQL,
/// and that [`ReadScope::admits`] evaluates in memory.
///
/// | Resource | Read (non-lead) | Create | Update / Delete |
/// |---|---|---|---|
/// | Budget | all | lead | lead |
/// | Invoice | assigned to caller | lead | lead |
/// | Task | assignee or creator | any member | lead, assignee, or creator |
/// | Note | creator | any member | lead or creator |
/// | Team | all | lead | lead |
///
/// Leads read everything.
///
/// # Example
///
/// ```
/// use opsdesk_shared::auth::identity::Caller;
/// use opsdesk_shared::auth::policy::{authorize, Operation, Ownership, ReadScope, Resource};
/// use opsdesk_shared::models::role::Role;
/// use uuid::Uuid;
///
/// let member = Caller { user_id: Uuid::new_v4(), role: Role::NonLead };
/// let task = Ownership { created_by: None, assignee: Some(member.user_id) };
///
/// assert!(authorize(Resource::Task, &member, Operation::Update, Some(&task)).is_ok());
/// assert_eq!(
///     ReadScope::for_caller(Resource::Note, &member),
///     ReadScope::CreatedBy(member.user_id),
/// );
/// ```

use std::fmt;

use uuid::Uuid;

use super::identity::Caller;

/// Resources guarded by the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Budget,
    Invoice,
    Task,
    Note,
    Team,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Budget,
        Resource::Invoice,
        Resource::Task,
        Resource::Note,
        Resource::Team,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Budget => "budget",
            Resource::Invoice => "invoice",
            Resource::Task => "task",
            Resource::Note => "note",
            Resource::Team => "team",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rows a non-lead caller may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRule {
    Everything,
    AssignedToCaller,
    AssignedToOrCreatedByCaller,
    CreatedByCaller,
}

/// Who may create a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRule {
    LeadOnly,
    AnyMember,
}

/// Who may update or delete an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRule {
    LeadOnly,
    LeadAssigneeOrCreator,
    LeadOrCreator,
}

/// One row of the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePolicy {
    pub resource: Resource,
    pub read: ReadRule,
    pub create: CreateRule,
    pub update: WriteRule,
    pub delete: WriteRule,
}

pub const POLICY_TABLE: [ResourcePolicy; 5] = [
    ResourcePolicy {
        resource: Resource::Budget,
        read: ReadRule::Everything,
        create: CreateRule::LeadOnly,
        update: WriteRule::LeadOnly,
        delete: WriteRule::LeadOnly,
    },
    ResourcePolicy {
        resource: Resource::Invoice,
        read: ReadRule::AssignedToCaller,
        create: CreateRule::LeadOnly,
        update: WriteRule::LeadOnly,
        delete: WriteRule::LeadOnly,
    },
    ResourcePolicy {
        resource: Resource::Task,
        read: ReadRule::AssignedToOrCreatedByCaller,
        create: CreateRule::AnyMember,
        update: WriteRule::LeadAssigneeOrCreator,
        delete: WriteRule::LeadAssigneeOrCreator,
    },
    ResourcePolicy {
        resource: Resource::Note,
        read: ReadRule::CreatedByCaller,
        create: CreateRule::AnyMember,
        update: WriteRule::LeadOrCreator,
        delete: WriteRule::LeadOrCreator,
    },
    ResourcePolicy {
        resource: Resource::Team,
        read: ReadRule::Everything,
        create: CreateRule::LeadOnly,
        update: WriteRule::LeadOnly,
        delete: WriteRule::LeadOnly,
    },
];

/// Looks up the table row for `resource`
pub fn policy_for(resource: Resource) -> &'static ResourcePolicy {
    match resource {
        Resource::Budget => &POLICY_TABLE[0],
        Resource::Invoice => &POLICY_TABLE[1],
        Resource::Task => &POLICY_TABLE[2],
        Resource::Note => &POLICY_TABLE[3],
        Resource::Team => &POLICY_TABLE[4],
    }
}

/// Ownership facts of a stored record
///
/// Both references are nullable: deleting a user clears them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    pub created_by: Option<Uuid>,
    pub assignee: Option<Uuid>,
}

impl Ownership {
    fn created_by(&self, user_id: Uuid) -> bool {
        self.created_by == Some(user_id)
    }

    fn assigned_to(&self, user_id: Uuid) -> bool {
        self.assignee == Some(user_id)
    }
}

/// Row filter applied to reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// No filter
    All,

    /// `assigned_user_id = id`
    AssignedTo(Uuid),

    /// `assignee_user_id = id OR created_by = id`
    AssigneeOrCreator(Uuid),

    /// `created_by = id`
    CreatedBy(Uuid),
}

impl ReadScope {
    /// Resolves the read rule of `resource` for `caller`
    pub fn for_caller(resource: Resource, caller: &Caller) -> Self {
        if caller.is_lead() {
            return ReadScope::All;
        }

        match policy_for(resource).read {
            ReadRule::Everything => ReadScope::All,
            ReadRule::AssignedToCaller => ReadScope::AssignedTo(caller.user_id),
            ReadRule::AssignedToOrCreatedByCaller => ReadScope::AssigneeOrCreator(caller.user_id),
            ReadRule::CreatedByCaller => ReadScope::CreatedBy(caller.user_id),
        }
    }

    /// Whether a record with `ownership` passes this filter
    pub fn admits(&self, ownership: &Ownership) -> bool {
        match *self {
            ReadScope::All => true,
            ReadScope::AssignedTo(id) => ownership.assigned_to(id),
            ReadScope::AssigneeOrCreator(id) => {
                ownership.assigned_to(id) || ownership.created_by(id)
            }
            ReadScope::CreatedBy(id) => ownership.created_by(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("You do not have permission to {operation} this {resource}")]
    Forbidden {
        resource: Resource,
        operation: Operation,
    },

    #[error("You cannot delete your own account")]
    SelfDeletion,
}

fn decide_create(rule: CreateRule, caller: &Caller) -> Decision {
    match rule {
        CreateRule::AnyMember => Decision::Allow,
        CreateRule::LeadOnly if caller.is_lead() => Decision::Allow,
        CreateRule::LeadOnly => Decision::Deny,
    }
}

fn decide_write(rule: WriteRule, caller: &Caller, record: Option<&Ownership>) -> Decision {
    if caller.is_lead() {
        return Decision::Allow;
    }

    // Ownership-based rules need the stored record
    let Some(record) = record else {
        return Decision::Deny;
    };

    let allowed = match rule {
        WriteRule::LeadOnly => false,
        WriteRule::LeadAssigneeOrCreator => {
            record.assigned_to(caller.user_id) || record.created_by(caller.user_id)
        }
        WriteRule::LeadOrCreator => record.created_by(caller.user_id),
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Evaluates the policy table
///
/// `record` is the ownership of the stored record for record-bound
/// operations. A read without a record is a collection read and is always
/// allowed; the rows are narrowed by [`ReadScope`] instead.
pub fn decide(
    resource: Resource,
    caller: &Caller,
    operation: Operation,
    record: Option<&Ownership>,
) -> Decision {
    let policy = policy_for(resource);

    match operation {
        Operation::Read => match record {
            Some(ownership) if !ReadScope::for_caller(resource, caller).admits(ownership) => {
                Decision::Deny
            }
            _ => Decision::Allow,
        },
        Operation::Create => decide_create(policy.create, caller),
        Operation::Update => decide_write(policy.update, caller, record),
        Operation::Delete => decide_write(policy.delete, caller, record),
    }
}

/// [`decide`] as a `Result`, for use with `?`
pub fn authorize(
    resource: Resource,
    caller: &Caller,
    operation: Operation,
    record: Option<&Ownership>,
) -> Result<(), AccessDenied> {
    match decide(resource, caller, operation, record) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AccessDenied::Forbidden {
            resource,
            operation,
        }),
    }
}

/// Team members may never delete their own account, whatever their role
pub fn forbid_self_deletion(caller: &Caller, target: Uuid) -> Result<(), AccessDenied> {
    if caller.user_id == target {
        return Err(AccessDenied::SelfDeletion);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    fn lead() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            role: Role::Lead,
        }
    }

    fn member() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            role: Role::NonLead,
        }
    }

    fn owned(created_by: Option<Uuid>, assignee: Option<Uuid>) -> Ownership {
        Ownership {
            created_by,
            assignee,
        }
    }

    const WRITES: [Operation; 2] = [Operation::Update, Operation::Delete];

    #[test]
    fn test_table_has_one_row_per_resource() {
        for resource in Resource::ALL {
            assert_eq!(policy_for(resource).resource, resource);
        }
    }

    #[test]
    fn test_lead_reads_everything() {
        let lead = lead();
        for resource in Resource::ALL {
            assert_eq!(ReadScope::for_caller(resource, &lead), ReadScope::All);
        }
    }

    #[test]
    fn test_member_read_scopes() {
        let m = member();

        assert_eq!(ReadScope::for_caller(Resource::Budget, &m), ReadScope::All);
        assert_eq!(ReadScope::for_caller(Resource::Team, &m), ReadScope::All);
        assert_eq!(
            ReadScope::for_caller(Resource::Invoice, &m),
            ReadScope::AssignedTo(m.user_id)
        );
        assert_eq!(
            ReadScope::for_caller(Resource::Task, &m),
            ReadScope::AssigneeOrCreator(m.user_id)
        );
        assert_eq!(
            ReadScope::for_caller(Resource::Note, &m),
            ReadScope::CreatedBy(m.user_id)
        );
    }

    #[test]
    fn test_task_scope_admits_assignee_or_creator_only() {
        let m = member();
        let other = Uuid::new_v4();
        let scope = ReadScope::for_caller(Resource::Task, &m);

        assert!(scope.admits(&owned(Some(m.user_id), None)));
        assert!(scope.admits(&owned(Some(other), Some(m.user_id))));
        assert!(!scope.admits(&owned(Some(other), Some(other))));
        assert!(!scope.admits(&owned(None, None)));
    }

    #[test]
    fn test_note_scope_admits_creator_only() {
        let m = member();
        let scope = ReadScope::for_caller(Resource::Note, &m);

        assert!(scope.admits(&owned(Some(m.user_id), None)));
        // Notes have no assignee, but a stray one must not widen access
        assert!(!scope.admits(&owned(Some(Uuid::new_v4()), Some(m.user_id))));
    }

    #[test]
    fn test_invoice_scope_ignores_creator() {
        let m = member();
        let scope = ReadScope::for_caller(Resource::Invoice, &m);

        assert!(scope.admits(&owned(None, Some(m.user_id))));
        assert!(!scope.admits(&owned(Some(m.user_id), None)));
    }

    #[test]
    fn test_member_cannot_create_budgets_invoices_or_users() {
        let m = member();

        for resource in [Resource::Budget, Resource::Invoice, Resource::Team] {
            assert_eq!(
                authorize(resource, &m, Operation::Create, None),
                Err(AccessDenied::Forbidden {
                    resource,
                    operation: Operation::Create
                })
            );
        }
    }

    #[test]
    fn test_member_can_create_tasks_and_notes() {
        let m = member();

        assert!(authorize(Resource::Task, &m, Operation::Create, None).is_ok());
        assert!(authorize(Resource::Note, &m, Operation::Create, None).is_ok());
    }

    #[test]
    fn test_lead_may_do_anything() {
        let lead = lead();
        let foreign = owned(Some(Uuid::new_v4()), Some(Uuid::new_v4()));

        for resource in Resource::ALL {
            for operation in [
                Operation::Read,
                Operation::Create,
                Operation::Update,
                Operation::Delete,
            ] {
                assert_eq!(
                    decide(resource, &lead, operation, Some(&foreign)),
                    Decision::Allow,
                    "{operation} on {resource}"
                );
            }
        }
    }

    #[test]
    fn test_member_writes_to_budgets_and_invoices_denied_even_when_owned() {
        let m = member();
        let mine = owned(Some(m.user_id), Some(m.user_id));

        for resource in [Resource::Budget, Resource::Invoice, Resource::Team] {
            for operation in WRITES {
                assert!(authorize(resource, &m, operation, Some(&mine)).is_err());
            }
        }
    }

    #[test]
    fn test_task_writes_need_assignee_or_creator() {
        let m = member();
        let other = Uuid::new_v4();

        for operation in WRITES {
            assert!(authorize(Resource::Task, &m, operation, Some(&owned(Some(m.user_id), None))).is_ok());
            assert!(authorize(Resource::Task, &m, operation, Some(&owned(Some(other), Some(m.user_id)))).is_ok());
            assert!(authorize(Resource::Task, &m, operation, Some(&owned(Some(other), Some(other)))).is_err());
            assert!(authorize(Resource::Task, &m, operation, Some(&owned(None, None))).is_err());
        }
    }

    #[test]
    fn test_note_writes_need_creator() {
        let m = member();

        for operation in WRITES {
            assert!(authorize(Resource::Note, &m, operation, Some(&owned(Some(m.user_id), None))).is_ok());
            assert!(authorize(
                Resource::Note,
                &m,
                operation,
                Some(&owned(Some(Uuid::new_v4()), Some(m.user_id)))
            )
            .is_err());
        }
    }

    #[test]
    fn test_member_writes_without_record_denied() {
        let m = member();

        assert_eq!(
            decide(Resource::Task, &m, Operation::Update, None),
            Decision::Deny
        );
    }

    #[test]
    fn test_record_read_follows_scope() {
        let m = member();

        assert_eq!(
            decide(Resource::Note, &m, Operation::Read, Some(&owned(Some(Uuid::new_v4()), None))),
            Decision::Deny
        );
        assert_eq!(
            decide(Resource::Note, &m, Operation::Read, Some(&owned(Some(m.user_id), None))),
            Decision::Allow
        );
        assert_eq!(decide(Resource::Note, &m, Operation::Read, None), Decision::Allow);
    }

    #[test]
    fn test_self_deletion_forbidden_for_everyone() {
        for caller in [lead(), member()] {
            assert_eq!(
                forbid_self_deletion(&caller, caller.user_id),
                Err(AccessDenied::SelfDeletion)
            );
            assert!(forbid_self_deletion(&caller, Uuid::new_v4()).is_ok());
        }
    }

    #[test]
    fn test_denial_messages() {
        let err = AccessDenied::Forbidden {
            resource: Resource::Invoice,
            operation: Operation::Delete,
        };
        assert_eq!(err.to_string(), "You do not have permission to delete this invoice");
        assert_eq!(
            AccessDenied::SelfDeletion.to_string(),
            "You cannot delete your own account"
        );
    }
}
