use std::fmt;

use crate::{
    storage::relation::DbRelation,
    types::{error::DatabaseError, handle::Handle, value::ValueDict},
};

/// A tree of relational operators evaluated over handles. Leaves scan a
/// relation; a projection at the top turns the surviving handles into rows.
#[derive(Clone)]
pub enum EvalPlan<'a> {
    Scan(&'a dyn DbRelation),
    Filter {
        predicate: ValueDict,
        input: Box<EvalPlan<'a>>,
    },
    ProjectAll(Box<EvalPlan<'a>>),
    Project {
        columns: Vec<String>,
        input: Box<EvalPlan<'a>>,
    },
}

impl<'a> EvalPlan<'a> {
    pub fn scan(relation: &'a dyn DbRelation) -> Self {
        EvalPlan::Scan(relation)
    }

    pub fn filter(self, predicate: ValueDict) -> Self {
        EvalPlan::Filter {
            predicate,
            input: Box::new(self),
        }
    }

    pub fn project_all(self) -> Self {
        EvalPlan::ProjectAll(Box::new(self))
    }

    pub fn project(self, columns: Vec<String>) -> Self {
        EvalPlan::Project {
            columns,
            input: Box::new(self),
        }
    }

    /// No rewrites yet; returns an equivalent plan.
    pub fn optimize(&self) -> EvalPlan<'a> {
        self.clone()
    }

    /// Run the plan and return the projected rows. The top node must be a
    /// projection.
    pub fn evaluate(&self) -> Result<Vec<ValueDict>, DatabaseError> {
        match self {
            EvalPlan::ProjectAll(input) => {
                let (relation, handles) = input.pipeline()?;
                handles
                    .into_iter()
                    .map(|handle| relation.project(handle))
                    .collect()
            }
            EvalPlan::Project { columns, input } => {
                let (relation, handles) = input.pipeline()?;
                handles
                    .into_iter()
                    .map(|handle| relation.project_columns(handle, columns))
                    .collect()
            }
            _ => Err(DatabaseError::relation(
                "only a projection can be evaluated; wrap the plan in project or project_all",
            )),
        }
    }

    /// The relation this plan reads from and the handles that survive it.
    pub fn pipeline(&self) -> Result<(&'a dyn DbRelation, Vec<Handle>), DatabaseError> {
        match self {
            EvalPlan::Scan(relation) => Ok((*relation, relation.select(None)?)),
            EvalPlan::Filter { predicate, input } => match input.as_ref() {
                EvalPlan::Scan(relation) => Ok((*relation, relation.select(Some(predicate))?)),
                other => {
                    let (relation, handles) = other.pipeline()?;
                    let columns: Vec<String> = predicate.keys().cloned().collect();
                    let mut kept = Vec::with_capacity(handles.len());
                    for handle in handles {
                        let row = relation.project_columns(handle, &columns)?;
                        if predicate.iter().all(|(column, value)| row.get(column) == Some(value)) {
                            kept.push(handle);
                        }
                    }
                    Ok((relation, kept))
                }
            },
            EvalPlan::ProjectAll(_) | EvalPlan::Project { .. } => Err(DatabaseError::relation(
                "a projection cannot feed another operator",
            )),
        }
    }
}

impl fmt::Debug for EvalPlan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalPlan::Scan(relation) => f.debug_tuple("Scan").field(&relation.table_name()).finish(),
            EvalPlan::Filter { predicate, input } => f
                .debug_struct("Filter")
                .field("predicate", predicate)
                .field("input", input)
                .finish(),
            EvalPlan::ProjectAll(input) => f.debug_tuple("ProjectAll").field(input).finish(),
            EvalPlan::Project { columns, input } => f
                .debug_struct("Project")
                .field("columns", columns)
                .field("input", input)
                .finish(),
        }
    }
}
