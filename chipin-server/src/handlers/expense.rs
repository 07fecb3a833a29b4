use actix_web::{web, HttpResponse};
use chipin_common::db::{self, DaoError, DbThreadPool};
use chipin_common::request_io::{
    InputEditExpense, InputEventId, InputExpense, InputExpenseId, OutputExpense,
};
use chipin_common::validators::Validity;

use crate::handlers::contribution::notify_watchers;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::verification;
use crate::middleware::AuthorizedUser;
use crate::realtime::{EventBroadcaster, LedgerUpdate};

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    user: AuthorizedUser,
    expense_data: web::Json<InputExpense>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, expense_data.event_id, user.user_id())
        .await?;

    if let Validity::Invalid(msg) = expense_data.validate_amount() {
        return Err(HttpErrorResponse::InvalidAmount(msg));
    }

    let expense_dao = db::expense::Dao::new(&db_thread_pool);
    let expense_data = expense_data.into_inner();
    let expense = match web::block(move || {
        expense_dao.create_expense(
            expense_data.event_id,
            &expense_data.description,
            &expense_data.category,
            expense_data.amount_cents,
            user.user_id(),
            expense_data.expense_date,
            expense_data.receipt_url.as_deref(),
        )
    })
    .await?
    {
        Ok(e) => e,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Event not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to record expense",
            )));
        }
    };

    let event_id = expense.event_id;
    let expense = OutputExpense::from(expense);

    notify_watchers(&db_thread_pool, &broadcaster, event_id, |stats| {
        LedgerUpdate::ExpenseAdded {
            expense: expense.clone(),
            stats,
        }
    })
    .await;

    Ok(HttpResponse::Created().json(expense))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    query: web::Query<InputEventId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let expense_dao = db::expense::Dao::new(&db_thread_pool);
    let event_id = query.event_id;
    let event_expenses =
        match web::block(move || expense_dao.get_expenses_for_event(event_id)).await? {
            Ok(e) => e,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get expenses",
                )));
            }
        };

    let event_expenses: Vec<OutputExpense> =
        event_expenses.into_iter().map(OutputExpense::from).collect();

    Ok(HttpResponse::Ok().json(event_expenses))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    user: AuthorizedUser,
    expense_data: web::Json<InputEditExpense>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, expense_data.event_id, user.user_id())
        .await?;

    if let Validity::Invalid(msg) = expense_data.validate_amount() {
        return Err(HttpErrorResponse::InvalidAmount(msg));
    }

    let expense_dao = db::expense::Dao::new(&db_thread_pool);
    let expense_data = expense_data.into_inner();
    let expense = match web::block(move || expense_dao.update_expense(&expense_data)).await? {
        Ok(e) => e,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Expense not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to edit expense",
            )));
        }
    };

    let event_id = expense.event_id;
    let expense = OutputExpense::from(expense);

    notify_watchers(&db_thread_pool, &broadcaster, event_id, |stats| {
        LedgerUpdate::ExpenseUpdated {
            expense: expense.clone(),
            stats,
        }
    })
    .await;

    Ok(HttpResponse::Ok().json(expense))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    user: AuthorizedUser,
    query: web::Query<InputExpenseId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let expense_dao = db::expense::Dao::new(&db_thread_pool);
    let expense_id = query.expense_id;
    let event_id = query.event_id;
    match web::block(move || expense_dao.delete_expense(expense_id, event_id)).await? {
        Ok(_) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Expense not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete expense",
            )));
        }
    };

    notify_watchers(&db_thread_pool, &broadcaster, event_id, |stats| {
        LedgerUpdate::ExpenseDeleted { expense_id, stats }
    })
    .await;

    Ok(HttpResponse::Ok().finish())
}
