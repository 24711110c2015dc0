//! Read projections over the parent-pointer account arena.
//!
//! Nothing here assumes the stored parent chain is acyclic. Every upward
//! walk is bounded by the number of accounts and every downward traversal
//! tracks visited nodes; both fail with `Cycle` instead of looping. All
//! traversals are iterative so arbitrarily deep trees cannot exhaust the
//! stack.

use std::collections::{HashMap, HashSet, VecDeque};

use tally_shared::types::AccountId;

use super::types::{Account, AccountNode, AccountStatistics};
use crate::error::{LedgerError, LedgerResult};

/// The account arena.
pub type Arena = HashMap<AccountId, Account>;

fn lookup(accounts: &Arena, id: AccountId) -> LedgerResult<&Account> {
    accounts
        .get(&id)
        .ok_or_else(|| LedgerError::not_found("Account", id))
}

fn cycle(account: &Account, detail: impl Into<String>) -> LedgerError {
    LedgerError::Cycle {
        code: account.code.clone(),
        detail: detail.into(),
    }
}

/// Ancestors of an account, nearest parent first.
///
/// # Errors
///
/// - `NotFound` if the account does not exist
/// - `Cycle` if the parent chain does not terminate
/// - `Internal` if a parent pointer dangles
pub fn ancestors(accounts: &Arena, id: AccountId) -> LedgerResult<Vec<&Account>> {
    let start = lookup(accounts, id)?;
    let mut chain = Vec::new();
    let mut current = start;

    while let Some(parent_id) = current.parent_id {
        if chain.len() >= accounts.len() {
            return Err(cycle(start, "parent chain does not terminate"));
        }
        let parent = accounts.get(&parent_id).ok_or_else(|| {
            LedgerError::Internal(format!(
                "account {} points at missing parent {parent_id}",
                current.code
            ))
        })?;
        if parent.id == start.id {
            return Err(cycle(start, "account is its own ancestor"));
        }
        chain.push(parent);
        current = parent;
    }

    Ok(chain)
}

/// Root-to-node path, the account itself last.
///
/// # Errors
///
/// Same as [`ancestors`].
pub fn path(accounts: &Arena, id: AccountId) -> LedgerResult<Vec<&Account>> {
    let mut chain = ancestors(accounts, id)?;
    chain.reverse();
    chain.push(lookup(accounts, id)?);
    Ok(chain)
}

/// Depth computed from the parent chain (roots are 0).
///
/// # Errors
///
/// Same as [`ancestors`].
pub fn depth(accounts: &Arena, id: AccountId) -> LedgerResult<u32> {
    let chain = ancestors(accounts, id)?;
    u32::try_from(chain.len()).map_err(|_| LedgerError::Internal("tree too deep".to_string()))
}

/// Returns true if `candidate` lies in the subtree below `root`.
///
/// # Errors
///
/// Same as [`ancestors`], evaluated for `candidate`.
pub fn is_descendant(accounts: &Arena, candidate: AccountId, root: AccountId) -> LedgerResult<bool> {
    Ok(ancestors(accounts, candidate)?
        .iter()
        .any(|ancestor| ancestor.id == root))
}

/// Parent → children index, children ordered by code.
fn child_index(accounts: &Arena) -> HashMap<AccountId, Vec<&Account>> {
    let mut index: HashMap<AccountId, Vec<&Account>> = HashMap::new();
    for account in accounts.values() {
        if let Some(parent_id) = account.parent_id {
            index.entry(parent_id).or_default().push(account);
        }
    }
    for children in index.values_mut() {
        children.sort_by(|a, b| a.code.cmp(&b.code));
    }
    index
}

/// Direct children, ordered by code.
///
/// # Errors
///
/// Returns `NotFound` if the account does not exist.
pub fn children(accounts: &Arena, id: AccountId) -> LedgerResult<Vec<&Account>> {
    lookup(accounts, id)?;
    let mut direct: Vec<&Account> = accounts
        .values()
        .filter(|a| a.parent_id == Some(id))
        .collect();
    direct.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(direct)
}

/// Every account below `id`, breadth-first.
///
/// # Errors
///
/// - `NotFound` if the account does not exist
/// - `Cycle` if a node is reached twice
pub fn descendants(accounts: &Arena, id: AccountId) -> LedgerResult<Vec<&Account>> {
    let root = lookup(accounts, id)?;
    let index = child_index(accounts);
    let mut visited: HashSet<AccountId> = HashSet::from([root.id]);
    let mut queue: VecDeque<AccountId> = VecDeque::from([root.id]);
    let mut found = Vec::new();

    while let Some(current) = queue.pop_front() {
        for child in index.get(&current).into_iter().flatten() {
            if !visited.insert(child.id) {
                return Err(cycle(child, "account reached twice below the same root"));
            }
            found.push(*child);
            queue.push_back(child.id);
        }
    }

    Ok(found)
}

/// Accounts without a parent, ordered by code.
#[must_use]
pub fn roots(accounts: &Arena) -> Vec<&Account> {
    let mut found: Vec<&Account> = accounts.values().filter(|a| a.parent_id.is_none()).collect();
    found.sort_by(|a, b| a.code.cmp(&b.code));
    found
}

/// Accounts without children, ordered by code.
#[must_use]
pub fn leaves(accounts: &Arena) -> Vec<&Account> {
    let parents: HashSet<AccountId> = accounts.values().filter_map(|a| a.parent_id).collect();
    let mut found: Vec<&Account> = accounts
        .values()
        .filter(|a| !parents.contains(&a.id))
        .collect();
    found.sort_by(|a, b| a.code.cmp(&b.code));
    found
}

/// Breadth-first order from the roots, failing if any account is unreachable
/// (unreachable accounts sit on a cycle).
fn reachable_order(accounts: &Arena) -> LedgerResult<Vec<AccountId>> {
    let index = child_index(accounts);
    let mut visited: HashSet<AccountId> = HashSet::with_capacity(accounts.len());
    let mut order = Vec::with_capacity(accounts.len());
    let mut queue: VecDeque<AccountId> = roots(accounts).iter().map(|a| a.id).collect();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current);
        for child in index.get(&current).into_iter().flatten() {
            queue.push_back(child.id);
        }
    }

    if order.len() < accounts.len() {
        let mut stranded: Vec<&Account> = accounts
            .values()
            .filter(|a| !visited.contains(&a.id))
            .collect();
        stranded.sort_by(|a, b| a.code.cmp(&b.code));
        if let Some(first) = stranded.first() {
            return Err(cycle(first, "account is not reachable from any root"));
        }
    }

    Ok(order)
}

/// Every account with each parent ahead of its children: breadth-first from
/// the roots, siblings ordered by code.
///
/// # Errors
///
/// Returns `Cycle` if some accounts cannot be reached from a root.
pub fn parent_first(accounts: &Arena) -> LedgerResult<Vec<&Account>> {
    Ok(reachable_order(accounts)?
        .into_iter()
        .filter_map(|id| accounts.get(&id))
        .collect())
}

/// The full chart as a nested forest, roots and children ordered by code.
///
/// # Errors
///
/// Returns `Cycle` if some accounts cannot be reached from a root.
pub fn forest(accounts: &Arena) -> LedgerResult<Vec<AccountNode>> {
    let order = reachable_order(accounts)?;
    let mut built: HashMap<AccountId, AccountNode> = HashMap::with_capacity(order.len());

    // Children come after their parent in breadth-first order, so building in
    // reverse finishes every subtree before its parent needs it.
    for id in order.iter().rev() {
        let account = lookup(accounts, *id)?;
        built.insert(
            *id,
            AccountNode {
                account: account.clone(),
                children: Vec::new(),
            },
        );
    }
    for id in order.iter().rev() {
        let Some(parent_id) = built.get(id).and_then(|node| node.account.parent_id) else {
            continue;
        };
        if let Some(node) = built.remove(id) {
            if let Some(parent) = built.get_mut(&parent_id) {
                parent.children.push(node);
            }
        }
    }

    let mut forest: Vec<AccountNode> = built.into_values().collect();
    sort_nodes(&mut forest);
    Ok(forest)
}

fn sort_nodes(nodes: &mut Vec<AccountNode>) {
    let mut stack: Vec<&mut Vec<AccountNode>> = vec![nodes];
    while let Some(level) = stack.pop() {
        level.sort_by(|a, b| a.account.code.cmp(&b.account.code));
        for node in level {
            stack.push(&mut node.children);
        }
    }
}

/// Chart statistics.
///
/// # Errors
///
/// Returns `Cycle` if some accounts cannot be reached from a root.
pub fn statistics(accounts: &Arena) -> LedgerResult<AccountStatistics> {
    let order = reachable_order(accounts)?;
    let mut levels: HashMap<AccountId, u32> = HashMap::with_capacity(order.len());
    let mut stats = AccountStatistics {
        total: accounts.len(),
        roots: roots(accounts).len(),
        leaves: leaves(accounts).len(),
        ..AccountStatistics::default()
    };

    for id in &order {
        let account = lookup(accounts, *id)?;
        let level = account
            .parent_id
            .and_then(|parent| levels.get(&parent))
            .map_or(0, |parent_level| parent_level + 1);
        levels.insert(*id, level);
        stats.max_depth = stats.max_depth.max(level);
        *stats.by_type.entry(account.account_type).or_default() += 1;
        if account.is_system {
            stats.system += 1;
        }
    }

    Ok(stats)
}
