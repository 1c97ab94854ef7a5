//! Monthly financial report: invoice income against operating expenses.
//!
//! Income and expenses are summed per currency ledger; nothing is converted.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{
    BillingError, BillingPeriod, CalculationError, Currency, Customer, CustomerId, Expense,
    ExpenseType, Invoice,
};

/// One invoice line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInvoiceLine {
    pub invoice_number: String,
    pub customer_id: CustomerId,
    /// `None` when the customer has since been removed.
    pub customer_name: Option<String>,
    pub consumption_kwh: Decimal,
    pub total_usd: Decimal,
    pub total_local: Decimal,
}

/// One expense line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportExpenseLine {
    pub label: String,
    pub expense_type: ExpenseType,
    pub amount: Decimal,
    pub currency: Currency,
}

/// Financial summary of one billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub period: BillingPeriod,
    pub invoice_count: usize,
    pub total_consumption_kwh: Decimal,
    pub invoices_total_usd: Decimal,
    pub invoices_total_local: Decimal,
    pub expense_count: usize,
    pub expenses_total_usd: Decimal,
    pub expenses_total_local: Decimal,
    /// Invoice income minus USD expenses.
    pub net_usd: Decimal,
    /// Invoice income minus local-currency expenses.
    pub net_local: Decimal,
    pub invoices: Vec<ReportInvoiceLine>,
    pub expenses: Vec<ReportExpenseLine>,
}

impl MonthlyReport {
    pub fn is_profitable_usd(&self) -> bool {
        self.net_usd >= Decimal::ZERO
    }

    pub fn is_profitable_local(&self) -> bool {
        self.net_local >= Decimal::ZERO
    }
}

/// Summarise the invoices and expenses recorded for `period`.
///
/// Records from other periods are ignored, so whole ledgers can be passed in.
/// Totals that overflow `Decimal` are reported as [`CalculationError::Arithmetic`].
pub fn generate_monthly_report(
    period: BillingPeriod,
    invoices: &[Invoice],
    expenses: &[Expense],
    customers: &[Customer],
) -> Result<MonthlyReport, BillingError> {
    let names: HashMap<CustomerId, &str> = customers
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let invoice_lines: Vec<ReportInvoiceLine> = invoices
        .iter()
        .filter(|i| i.period == period)
        .map(|i| ReportInvoiceLine {
            invoice_number: i.number.clone(),
            customer_id: i.customer_id,
            customer_name: names.get(&i.customer_id).map(|n| n.to_string()),
            consumption_kwh: i.consumption_kwh(),
            total_usd: i.total_usd(),
            total_local: i.total_local(),
        })
        .collect();

    let expense_lines: Vec<ReportExpenseLine> = expenses
        .iter()
        .filter(|e| e.period == period)
        .map(|e| ReportExpenseLine {
            label: e.label.clone(),
            expense_type: e.expense_type,
            amount: e.amount,
            currency: e.currency,
        })
        .collect();

    let total_consumption_kwh = sum(invoice_lines.iter().map(|l| l.consumption_kwh))?;
    let invoices_total_usd = sum(invoice_lines.iter().map(|l| l.total_usd))?;
    let invoices_total_local = sum(invoice_lines.iter().map(|l| l.total_local))?;

    let expenses_in = |currency: Currency| {
        sum(expense_lines
            .iter()
            .filter(|l| l.currency == currency)
            .map(|l| l.amount))
    };
    let expenses_total_usd = expenses_in(Currency::Usd)?;
    let expenses_total_local = expenses_in(Currency::Local)?;

    let net = |income: Decimal, spent: Decimal| {
        income
            .checked_sub(spent)
            .ok_or(CalculationError::Arithmetic("report net"))
    };

    Ok(MonthlyReport {
        period,
        invoice_count: invoice_lines.len(),
        total_consumption_kwh,
        invoices_total_usd,
        invoices_total_local,
        expense_count: expense_lines.len(),
        expenses_total_usd,
        expenses_total_local,
        net_usd: net(invoices_total_usd, expenses_total_usd)?,
        net_local: net(invoices_total_local, expenses_total_local)?,
        invoices: invoice_lines,
        expenses: expense_lines,
    })
}

fn sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal, CalculationError> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or(CalculationError::Arithmetic("report total"))
    })
}
