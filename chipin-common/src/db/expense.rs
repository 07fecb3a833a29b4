use diesel::result::DatabaseErrorKind;
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::expense::{Expense, NewExpense};
use crate::request_io::InputEditExpense;
use crate::schema::expenses as expense_fields;
use crate::schema::expenses::dsl::expenses;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Expenses have no approval workflow; they count toward total spend the
    /// moment they are recorded.
    #[allow(clippy::too_many_arguments)]
    pub fn create_expense(
        &self,
        event_id: Uuid,
        description: &str,
        category: &str,
        amount_cents: i64,
        added_by: Uuid,
        expense_date: SystemTime,
        receipt_url: Option<&str>,
    ) -> Result<Expense, DaoError> {
        let new_expense = NewExpense {
            id: Uuid::now_v7(),
            event_id,
            description,
            category,
            amount_cents,
            added_by,
            expense_date,
            receipt_url,
            created_timestamp: SystemTime::now(),
        };

        let result = dsl::insert_into(expenses)
            .values(&new_expense)
            .get_result::<Expense>(&mut self.db_thread_pool.get()?);

        match result {
            Ok(expense) => Ok(expense),
            Err(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => Err(DaoError::QueryFailure(diesel::result::Error::NotFound)),
            Err(e) => Err(DaoError::from(e)),
        }
    }

    pub fn get_expenses_for_event(&self, event_id: Uuid) -> Result<Vec<Expense>, DaoError> {
        Ok(expenses
            .filter(expense_fields::event_id.eq(event_id))
            .order(expense_fields::expense_date.asc())
            .load::<Expense>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn update_expense(&self, expense_data: &InputEditExpense) -> Result<Expense, DaoError> {
        Ok(dsl::update(
            expenses
                .find(expense_data.expense_id)
                .filter(expense_fields::event_id.eq(expense_data.event_id)),
        )
        .set((
            expense_fields::description.eq(&expense_data.description),
            expense_fields::category.eq(&expense_data.category),
            expense_fields::amount_cents.eq(expense_data.amount_cents),
            expense_fields::expense_date.eq(expense_data.expense_date),
            expense_fields::receipt_url.eq(expense_data.receipt_url.as_deref()),
        ))
        .get_result::<Expense>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_expense(&self, expense_id: Uuid, event_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            expenses
                .find(expense_id)
                .filter(expense_fields::event_id.eq(event_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }
}
