//! Account registry operations.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, PageRequest, PageResponse, exceeds_scale};
use tracing::{debug, info, warn};

use super::templates::{self, AccountTemplate, TemplateSummary};
use super::tree;
use super::types::{
    Account, AccountFilter, AccountNode, AccountStatistics, AccountType, CreateAccountInput,
    NormalBalance, UpdateAccountInput,
};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{Ledger, LedgerState};

/// A create request that passed validation.
struct CheckedCreate {
    code: String,
    name: String,
    account_type: AccountType,
    normal_balance: NormalBalance,
    parent_id: Option<AccountId>,
    level: u32,
    opening_balance: Decimal,
}

fn non_blank(field: &str, value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(field, "must not be blank"));
    }
    Ok(trimmed.to_string())
}

fn check_normal_balance(
    account_type: AccountType,
    normal_balance: Option<NormalBalance>,
) -> LedgerResult<NormalBalance> {
    let canonical = account_type.normal_balance();
    match normal_balance {
        Some(given) if given != canonical => Err(LedgerError::validation(
            "normal_balance",
            format!("{account_type} accounts are {canonical}-normal, not {given}"),
        )),
        _ => Ok(canonical),
    }
}

impl LedgerState {
    fn check_create(&self, input: &CreateAccountInput, scale: u32) -> LedgerResult<CheckedCreate> {
        let code = non_blank("code", &input.code)?;
        let name = non_blank("name", &input.name)?;
        let account_type = input
            .account_type
            .ok_or_else(|| LedgerError::validation("type", "account type is required"))?;
        let normal_balance = check_normal_balance(account_type, input.normal_balance)?;

        if self.codes.contains_key(&code) {
            return Err(LedgerError::validation(
                "code",
                format!("account code {code} already exists"),
            ));
        }

        let (parent_id, level) = match input.parent_code.as_deref().map(str::trim) {
            None | Some("") => (None, 0),
            Some(parent_code) => {
                let parent = self.account_by_code(parent_code).map_err(|_| {
                    LedgerError::validation(
                        "parent_code",
                        format!("parent account {parent_code} does not exist"),
                    )
                })?;
                // A fresh node cannot close a loop, but the parent's own chain
                // must still be sound.
                let parent_depth = tree::depth(&self.accounts, parent.id)?;
                (Some(parent.id), parent_depth + 1)
            }
        };

        let opening_balance = input.opening_balance.unwrap_or_default();
        if exceeds_scale(opening_balance, scale) {
            return Err(LedgerError::validation(
                "opening_balance",
                format!("amounts allow at most {scale} decimal places"),
            ));
        }

        Ok(CheckedCreate {
            code,
            name,
            account_type,
            normal_balance,
            parent_id,
            level,
            opening_balance,
        })
    }

    /// Validates and inserts a new account.
    pub(crate) fn insert_account(
        &mut self,
        input: CreateAccountInput,
        scale: u32,
    ) -> LedgerResult<&Account> {
        let checked = self.check_create(&input, scale)?;
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            code: checked.code,
            name: checked.name,
            description: input.description.filter(|d| !d.trim().is_empty()),
            account_type: checked.account_type,
            normal_balance: checked.normal_balance,
            parent_id: checked.parent_id,
            level: checked.level,
            opening_balance: checked.opening_balance,
            current_balance: checked.opening_balance,
            is_system: input.is_system,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let id = account.id;
        self.codes.insert(account.code.clone(), id);
        self.accounts.insert(id, account);
        self.account(id)
    }

    /// Rewrites stored levels for `root` and its subtree from the parent chain.
    fn relevel_subtree(&mut self, root: AccountId) -> LedgerResult<()> {
        let mut levels: HashMap<AccountId, u32> =
            HashMap::from([(root, tree::depth(&self.accounts, root)?)]);
        // Breadth-first, so every parent is levelled before its children.
        for account in tree::descendants(&self.accounts, root)? {
            let parent_level = account
                .parent_id
                .and_then(|parent| levels.get(&parent).copied())
                .ok_or_else(|| LedgerError::Internal(format!("parent of {} not levelled", account.code)))?;
            levels.insert(account.id, parent_level + 1);
        }

        let now = Utc::now();
        for (id, level) in levels {
            if let Some(account) = self.accounts.get_mut(&id) {
                if account.level != level {
                    account.level = level;
                    account.version += 1;
                    account.updated_at = now;
                }
            }
        }
        Ok(())
    }
}

/// Orders template rows so every parent precedes its children. Rows may refer
/// to parents already in the ledger or later in the list.
fn parent_first(
    state: &LedgerState,
    mut pending: Vec<CreateAccountInput>,
) -> LedgerResult<Vec<CreateAccountInput>> {
    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let before = pending.len();
        let mut waiting = Vec::new();
        for input in pending {
            let ready = match input.parent_code.as_deref().map(str::trim) {
                None | Some("") => true,
                Some(parent) => placed.contains(parent) || state.codes.contains_key(parent),
            };
            if ready {
                placed.insert(input.code.trim().to_string());
                ordered.push(input);
            } else {
                waiting.push(input);
            }
        }

        if waiting.len() == before {
            let stuck = &waiting[0];
            let parent = stuck.parent_code.as_deref().unwrap_or_default();
            let batch_codes: HashSet<&str> = waiting.iter().map(|i| i.code.trim()).collect();
            let reason = if batch_codes.contains(parent.trim()) {
                format!("parent {parent} is part of a cycle within the template")
            } else {
                format!("parent account {parent} does not exist")
            };
            return Err(LedgerError::Template {
                code: stuck.code.clone(),
                reason,
            });
        }
        pending = waiting;
    }

    Ok(ordered)
}

fn cloned(accounts: Vec<&Account>) -> Vec<Account> {
    accounts.into_iter().cloned().collect()
}

impl Ledger {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the code exists, the code or name is blank,
    /// the type is missing, the parent does not resolve, or the normal balance
    /// disagrees with the type.
    pub fn create_account(&self, input: CreateAccountInput) -> LedgerResult<Account> {
        let scale = self.settings().amount_scale;
        let mut state = self.write()?;
        let account = state.insert_account(input, scale)?.clone();
        info!(
            account_id = %account.id,
            code = %account.code,
            account_type = %account.account_type,
            "Account created"
        );
        Ok(account)
    }

    /// Updates an account's attributes (full or partial).
    ///
    /// # Errors
    ///
    /// - `VersionMismatch` if `expected_version` is stale
    /// - `Conflict` when changing code, type or normal balance of a referenced
    ///   account, or renaming a system account
    /// - `Validation` for blank or duplicate codes and mismatched normal balances
    pub fn update_account(&self, id: AccountId, input: UpdateAccountInput) -> LedgerResult<Account> {
        let mut state = self.write()?;
        let current = state.account(id)?;

        if let Some(expected) = input.expected_version {
            if expected != current.version {
                return Err(LedgerError::VersionMismatch {
                    code: current.code.clone(),
                    expected,
                    actual: current.version,
                });
            }
        }

        let code = input.code.as_deref().map(|c| non_blank("code", c)).transpose()?;
        let name = input.name.as_deref().map(|n| non_blank("name", n)).transpose()?;
        let code_changed = code.as_ref().is_some_and(|c| *c != current.code);
        let name_changed = name.as_ref().is_some_and(|n| *n != current.name);

        if current.is_system && (code_changed || name_changed) {
            return Err(LedgerError::conflict(format!(
                "system account {} cannot be renamed",
                current.code
            )));
        }

        let account_type = input.account_type.unwrap_or(current.account_type);
        let normal_balance = match (input.account_type, input.normal_balance) {
            (None, None) => current.normal_balance,
            (_, given) => check_normal_balance(account_type, given)?,
        };
        let structural = code_changed
            || account_type != current.account_type
            || normal_balance != current.normal_balance;

        if structural {
            let references = state.line_references(id);
            if references > 0 {
                return Err(LedgerError::conflict(format!(
                    "account {} is referenced by {references} journal line(s); only name and description may change",
                    current.code
                )));
            }
        }

        if let Some(new_code) = code.as_ref().filter(|_| code_changed) {
            if state.codes.contains_key(new_code) {
                return Err(LedgerError::validation(
                    "code",
                    format!("account code {new_code} already exists"),
                ));
            }
        }

        let old_code = current.code.clone();
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("Account", id))?;
        if let Some(name) = name {
            account.name = name;
        }
        if let Some(description) = input.description {
            account.description = description.filter(|d| !d.trim().is_empty());
        }
        account.account_type = account_type;
        account.normal_balance = normal_balance;
        if let Some(new_code) = code.filter(|_| code_changed) {
            account.code = new_code;
        }
        account.version += 1;
        account.updated_at = Utc::now();
        let account = account.clone();

        if code_changed {
            state.codes.remove(&old_code);
            state.codes.insert(account.code.clone(), id);
        }

        info!(account_id = %id, code = %account.code, version = account.version, "Account updated");
        Ok(account)
    }

    /// Moves an account under a new parent (or to the root with `None`) and
    /// recomputes the subtree's levels.
    ///
    /// # Errors
    ///
    /// - `Cycle` if the new parent is the account itself or one of its descendants
    /// - `Validation` if the new parent does not exist
    pub fn move_account(&self, id: AccountId, new_parent_code: Option<&str>) -> LedgerResult<Account> {
        let mut state = self.write()?;
        let account = state.account(id)?;
        let code = account.code.clone();

        let new_parent = match new_parent_code.map(str::trim) {
            None | Some("") => None,
            Some(parent_code) => {
                let parent = state.account_by_code(parent_code).map_err(|_| {
                    LedgerError::validation(
                        "parent_code",
                        format!("parent account {parent_code} does not exist"),
                    )
                })?;
                if parent.id == id {
                    return Err(LedgerError::Cycle {
                        code,
                        detail: "an account cannot be its own parent".to_string(),
                    });
                }
                if tree::is_descendant(&state.accounts, parent.id, id)? {
                    warn!(code = %code, parent = %parent.code, "Rejected move under own descendant");
                    return Err(LedgerError::Cycle {
                        code,
                        detail: format!("{} is a descendant of this account", parent.code),
                    });
                }
                Some(parent.id)
            }
        };

        if let Some(account) = state.accounts.get_mut(&id) {
            account.parent_id = new_parent;
            account.version += 1;
            account.updated_at = Utc::now();
        }
        state.relevel_subtree(id)?;

        let account = state.account(id)?.clone();
        info!(account_id = %id, code = %account.code, level = account.level, "Account moved");
        Ok(account)
    }

    /// Deletes a leaf account with zero balance and no journal references.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the account is system-flagged, has children, a
    /// non-zero balance, or any journal line reference.
    pub fn delete_account(&self, id: AccountId) -> LedgerResult<()> {
        let mut state = self.write()?;
        let account = state.account(id)?;

        if account.is_system {
            return Err(LedgerError::conflict(format!(
                "system account {} cannot be deleted",
                account.code
            )));
        }
        if state.accounts.values().any(|a| a.parent_id == Some(id)) {
            return Err(LedgerError::conflict(format!(
                "account {} has child accounts",
                account.code
            )));
        }
        if !account.current_balance.is_zero() {
            return Err(LedgerError::conflict(format!(
                "account {} has a non-zero balance of {}",
                account.code, account.current_balance
            )));
        }
        let references = state.line_references(id);
        if references > 0 {
            return Err(LedgerError::conflict(format!(
                "account {} is referenced by {references} journal line(s)",
                account.code
            )));
        }

        let code = account.code.clone();
        state.accounts.remove(&id);
        state.codes.remove(&code);
        info!(account_id = %id, code = %code, "Account deleted");
        Ok(())
    }

    /// Gets an account by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.read()?.account(id).cloned()
    }

    /// Gets an account by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has the code.
    pub fn get_account_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.read()?.account_by_code(code.trim()).cloned()
    }

    /// Lists accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent filter names an unknown code.
    pub fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<Account>> {
        let state = self.read()?;
        let parent = match filter.parent_code.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(None),
            Some(code) => Some(Some(state.account_by_code(code)?.id)),
        };
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| filter.account_type.is_none_or(|t| a.account_type == t))
            .filter(|a| parent.is_none_or(|p| a.parent_id == p))
            .filter(|a| {
                search.as_ref().is_none_or(|s| {
                    a.name.to_lowercase().contains(s) || a.code.to_lowercase().contains(s)
                })
            })
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(self.page(page).paginate(accounts))
    }

    /// Ancestors, nearest parent first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Cycle`.
    pub fn ancestors(&self, id: AccountId) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        tree::ancestors(&state.accounts, id).map(cloned)
    }

    /// Whole subtree below an account, breadth-first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Cycle`.
    pub fn descendants(&self, id: AccountId) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        tree::descendants(&state.accounts, id).map(cloned)
    }

    /// Direct children ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub fn children(&self, id: AccountId) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        tree::children(&state.accounts, id).map(cloned)
    }

    /// Root-to-node path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Cycle`.
    pub fn account_path(&self, id: AccountId) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        tree::path(&state.accounts, id).map(cloned)
    }

    /// Depth of an account computed from its parent chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Cycle`.
    pub fn account_level(&self, id: AccountId) -> LedgerResult<u32> {
        let state = self.read()?;
        tree::depth(&state.accounts, id)
    }

    /// The whole chart as a nested forest.
    ///
    /// # Errors
    ///
    /// Returns `Cycle` if the stored tree is corrupt.
    pub fn account_tree(&self) -> LedgerResult<Vec<AccountNode>> {
        let state = self.read()?;
        let forest = tree::forest(&state.accounts)?;
        debug!(roots = forest.len(), "Built account tree");
        Ok(forest)
    }

    /// Accounts without a parent.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn root_accounts(&self) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        Ok(cloned(tree::roots(&state.accounts)))
    }

    /// Accounts without children.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the store is unavailable.
    pub fn leaf_accounts(&self) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        Ok(cloned(tree::leaves(&state.accounts)))
    }

    /// Counts by type, roots, leaves and depth.
    ///
    /// # Errors
    ///
    /// Returns `Cycle` if the stored tree is corrupt.
    pub fn account_statistics(&self) -> LedgerResult<AccountStatistics> {
        let state = self.read()?;
        tree::statistics(&state.accounts)
    }

    /// Built-in templates.
    #[must_use]
    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        templates::summaries()
    }

    /// A built-in template with its full account list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown template name.
    pub fn get_template(&self, name: &str) -> LedgerResult<AccountTemplate> {
        templates::template(name).ok_or_else(|| LedgerError::not_found("Template", name))
    }

    /// Creates every account in `accounts`, parents first, or none at all.
    ///
    /// # Errors
    ///
    /// Returns `Template` naming the first account that fails single-create
    /// validation or whose parent cannot be placed.
    pub fn apply_template(&self, accounts: Vec<CreateAccountInput>) -> LedgerResult<Vec<Account>> {
        let scale = self.settings().amount_scale;
        let result = self.atomically(|state| {
            let ordered = parent_first(state, accounts)?;
            let mut created = Vec::with_capacity(ordered.len());
            for input in ordered {
                let code = input.code.clone();
                let account = state
                    .insert_account(input, scale)
                    .map_err(|err| LedgerError::Template {
                        code,
                        reason: err.to_string(),
                    })?;
                created.push(account.clone());
            }
            Ok(created)
        });

        match &result {
            Ok(created) => info!(count = created.len(), "Account template applied"),
            Err(err) => warn!(error = %err, "Account template rejected"),
        }
        result
    }

    /// Applies a built-in template by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown template, otherwise as
    /// [`Ledger::apply_template`].
    pub fn apply_named_template(&self, name: &str) -> LedgerResult<Vec<Account>> {
        let template = self.get_template(name)?;
        self.apply_template(template.accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    #[fixture]
    fn ledger() -> Ledger {
        let ledger = Ledger::default();
        ledger
            .create_account(CreateAccountInput::new("1000", "Assets", AccountType::Asset))
            .unwrap();
        ledger
            .create_account(CreateAccountInput::new("1100", "Cash", AccountType::Asset).with_parent("1000"))
            .unwrap();
        ledger
            .create_account(
                CreateAccountInput::new("1110", "Petty Cash", AccountType::Asset).with_parent("1100"),
            )
            .unwrap();
        ledger
    }

    fn id(ledger: &Ledger, code: &str) -> AccountId {
        ledger.get_account_by_code(code).unwrap().id
    }

    #[rstest]
    fn test_create_sets_level_and_normal_balance(ledger: Ledger) {
        let petty = ledger.get_account_by_code("1110").unwrap();
        assert_eq!(petty.level, 2);
        assert_eq!(petty.normal_balance, NormalBalance::Debit);
        assert_eq!(petty.version, 1);
    }

    #[rstest]
    #[case::duplicate(CreateAccountInput::new("1000", "Again", AccountType::Asset), "code")]
    #[case::blank_code(CreateAccountInput::new("  ", "Blank", AccountType::Asset), "code")]
    #[case::blank_name(CreateAccountInput::new("1200", "", AccountType::Asset), "name")]
    #[case::unknown_parent(
        CreateAccountInput::new("1200", "Bank", AccountType::Asset).with_parent("9999"),
        "parent_code"
    )]
    #[case::missing_type(
        CreateAccountInput { code: "1200".into(), name: "Bank".into(), ..CreateAccountInput::default() },
        "type"
    )]
    #[case::wrong_side(
        CreateAccountInput { normal_balance: Some(NormalBalance::Credit), ..CreateAccountInput::new("1200", "Bank", AccountType::Asset) },
        "normal_balance"
    )]
    fn test_create_rejects(ledger: Ledger, #[case] input: CreateAccountInput, #[case] field: &str) {
        let err = ledger.create_account(input).unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[rstest]
    fn test_move_recomputes_subtree_levels(ledger: Ledger) {
        let cash = id(&ledger, "1100");
        let moved = ledger.move_account(cash, None).unwrap();
        assert_eq!(moved.level, 0);
        assert_eq!(ledger.get_account_by_code("1110").unwrap().level, 1);
    }

    #[rstest]
    fn test_move_deepens_every_branch_of_the_subtree(ledger: Ledger) {
        for (code, parent) in [("1120", Some("1100")), ("1121", Some("1120")), ("2000", None), ("2100", Some("2000"))] {
            let input = CreateAccountInput::new(code, "Node", AccountType::Asset);
            ledger
                .create_account(match parent {
                    Some(parent) => input.with_parent(parent),
                    None => input,
                })
                .unwrap();
        }

        let cash = id(&ledger, "1100");
        assert_eq!(ledger.move_account(cash, Some("2100")).unwrap().level, 2);
        for (code, level) in [("1110", 3), ("1120", 3), ("1121", 4), ("1000", 0)] {
            assert_eq!(ledger.get_account_by_code(code).unwrap().level, level, "{code}");
        }
    }

    #[rstest]
    fn test_move_under_descendant_is_cycle(ledger: Ledger) {
        let root = id(&ledger, "1000");
        let before = ledger.account_tree().unwrap();

        assert!(matches!(
            ledger.move_account(root, Some("1110")),
            Err(LedgerError::Cycle { .. })
        ));
        assert!(matches!(
            ledger.move_account(root, Some("1000")),
            Err(LedgerError::Cycle { .. })
        ));
        assert_eq!(ledger.account_tree().unwrap(), before);
    }

    #[rstest]
    fn test_delete_rules(ledger: Ledger) {
        let cash = id(&ledger, "1100");
        assert!(matches!(ledger.delete_account(cash), Err(LedgerError::Conflict { .. })));

        let funded = ledger
            .create_account(
                CreateAccountInput::new("1200", "Bank", AccountType::Asset).with_opening_balance(dec!(10)),
            )
            .unwrap();
        assert!(matches!(ledger.delete_account(funded.id), Err(LedgerError::Conflict { .. })));

        let petty = id(&ledger, "1110");
        ledger.delete_account(petty).unwrap();
        assert!(matches!(
            ledger.get_account_by_code("1110"),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[rstest]
    fn test_system_account_is_protected(ledger: Ledger) {
        let system = ledger
            .create_account(CreateAccountInput::new("3000", "Equity", AccountType::Equity).system())
            .unwrap();
        assert!(matches!(ledger.delete_account(system.id), Err(LedgerError::Conflict { .. })));
        let rename = UpdateAccountInput {
            name: Some("Capital".into()),
            ..UpdateAccountInput::default()
        };
        assert!(matches!(
            ledger.update_account(system.id, rename),
            Err(LedgerError::Conflict { .. })
        ));
    }

    #[rstest]
    fn test_update_checks_version_and_retypes(ledger: Ledger) {
        let petty = ledger.get_account_by_code("1110").unwrap();
        let stale = UpdateAccountInput {
            name: Some("Float".into()),
            expected_version: Some(petty.version + 1),
            ..UpdateAccountInput::default()
        };
        assert!(matches!(
            ledger.update_account(petty.id, stale),
            Err(LedgerError::VersionMismatch { .. })
        ));

        let retype = UpdateAccountInput {
            code: Some("6100".into()),
            account_type: Some(AccountType::Expense),
            expected_version: Some(petty.version),
            ..UpdateAccountInput::default()
        };
        let updated = ledger.update_account(petty.id, retype).unwrap();
        assert_eq!(updated.code, "6100");
        assert_eq!(updated.normal_balance, NormalBalance::Debit);
        assert_eq!(updated.version, petty.version + 1);
        assert!(ledger.get_account_by_code("1110").is_err());
        assert_eq!(ledger.get_account_by_code("6100").unwrap().id, petty.id);
    }

    #[rstest]
    fn test_list_filters(ledger: Ledger) {
        let filter = AccountFilter {
            search: Some("cash".into()),
            ..AccountFilter::default()
        };
        let page = ledger.list_accounts(&filter, PageRequest::default()).unwrap();
        assert_eq!(page.pagination.total, 2);

        let roots = AccountFilter {
            parent_code: Some(String::new()),
            ..AccountFilter::default()
        };
        let page = ledger.list_accounts(&roots, PageRequest::default()).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].code, "1000");
    }

    #[test]
    fn test_apply_template_orders_parents_first() {
        let ledger = Ledger::default();
        let created = ledger
            .apply_template(vec![
                CreateAccountInput::new("1110", "Petty Cash", AccountType::Asset).with_parent("1100"),
                CreateAccountInput::new("1100", "Cash", AccountType::Asset).with_parent("1000"),
                CreateAccountInput::new("1000", "Assets", AccountType::Asset),
            ])
            .unwrap();
        let codes: Vec<_> = created.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, ["1000", "1100", "1110"]);
    }

    #[rstest]
    fn test_apply_template_is_all_or_nothing(ledger: Ledger) {
        let err = ledger
            .apply_template(vec![
                CreateAccountInput::new("2000", "Liabilities", AccountType::Liability),
                CreateAccountInput::new("1100", "Duplicate", AccountType::Asset),
            ])
            .unwrap_err();

        assert!(matches!(err, LedgerError::Template { ref code, .. } if code == "1100"));
        assert!(ledger.get_account_by_code("2000").is_err());
    }

    #[test]
    fn test_apply_named_template() {
        let ledger = Ledger::default();
        let created = ledger.apply_named_template("retail").unwrap();
        assert_eq!(created.len(), ledger.account_statistics().unwrap().total);
        assert!(matches!(
            ledger.apply_named_template("retail"),
            Err(LedgerError::Template { .. })
        ));
        assert!(matches!(
            ledger.apply_named_template("unknown"),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_get_template_matches_summary() {
        let ledger = Ledger::default();
        let template = ledger.get_template(" Services ").unwrap();
        let summary = ledger
            .list_templates()
            .into_iter()
            .find(|summary| summary.name == "services")
            .unwrap();
        assert_eq!(template.accounts.len(), summary.account_count);
        assert_eq!(ledger.account_statistics().unwrap().total, 0);
    }
}
