use chrono::{Datelike, Utc};
use tracing::{info, warn};

use super::error::LedgerError;
use super::store::{LedgerStore, MemoryLedger};
use crate::core::*;

/// Default prefix for invoice numbers ("INV-2024-03-001").
pub const DEFAULT_NUMBER_PREFIX: &str = "INV-";

/// Invoice selection. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub period: Option<BillingPeriod>,
    pub customer_id: Option<CustomerId>,
    pub year: Option<i32>,
}

impl InvoiceFilter {
    pub fn period(period: BillingPeriod) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }

    pub fn customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.period.is_none_or(|p| invoice.period == p)
            && self.customer_id.is_none_or(|c| invoice.customer_id == c)
            && self.year.is_none_or(|y| invoice.period.year() == y)
    }
}

/// Customer selection: `search` matches the name case-insensitively or the phone
/// number as a substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                customer.name.to_lowercase().contains(&term.to_lowercase())
                    || customer.phone.as_deref().is_some_and(|p| p.contains(term))
            }
        };
        search_ok && self.status.is_none_or(|s| customer.status == s)
    }
}

/// Expense selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub period: Option<BillingPeriod>,
    pub expense_type: Option<ExpenseType>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.period.is_none_or(|p| expense.period == p)
            && self.expense_type.is_none_or(|t| expense.expense_type == t)
    }
}

/// Billing operations over a [`LedgerStore`].
///
/// The service owns its store and settings; callers hand it in explicitly
/// rather than reaching for shared global state.
///
/// ```
/// use ishtirak::core::*;
/// use ishtirak::ledger::*;
/// use rust_decimal_macros::dec;
///
/// let mut billing = BillingService::in_memory(Settings::default()).unwrap();
/// let customer = billing.new_customer("أبو علي").build().unwrap();
/// let id = billing.add_customer(customer).unwrap();
///
/// let period: BillingPeriod = "2024-03".parse().unwrap();
/// let draft = billing.draft_invoice(&id, period).unwrap().meter_current(dec!(250));
/// let invoice = billing.issue_invoice(draft).unwrap();
///
/// assert_eq!(invoice.number, "INV-2024-03-001");
/// assert_eq!(invoice.total_usd(), dec!(118.5));
/// assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(250));
/// ```
#[derive(Debug)]
pub struct BillingService<S: LedgerStore = MemoryLedger> {
    store: S,
    settings: Settings,
    number_prefix: String,
}

impl BillingService<MemoryLedger> {
    /// Service over an empty in-memory ledger.
    pub fn in_memory(settings: Settings) -> Result<Self, LedgerError> {
        Self::new(MemoryLedger::new(), settings)
    }
}

impl<S: LedgerStore> BillingService<S> {
    pub fn new(store: S, settings: Settings) -> Result<Self, LedgerError> {
        check(validate_settings(&settings))?;
        Ok(Self {
            store,
            settings,
            number_prefix: DEFAULT_NUMBER_PREFIX.to_string(),
        })
    }

    pub fn with_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.number_prefix = prefix.into();
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Replace the settings. Invoices already issued keep their captured rate.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), LedgerError> {
        if let Err(err) = check(validate_settings(&settings)) {
            warn!(error = %err, "settings update rejected");
            return Err(err);
        }
        info!(
            exchange_rate = %settings.exchange_rate,
            rounding_unit = settings.rounding_unit,
            "settings updated"
        );
        self.settings = settings;
        Ok(())
    }

    // ── Customers ──────────────────────────────────────────────────────────

    /// Customer builder prefilled with the current default tariff.
    pub fn new_customer(&self, name: impl Into<String>) -> CustomerBuilder {
        CustomerBuilder::new(name, &self.settings)
    }

    pub fn add_customer(&mut self, customer: Customer) -> Result<CustomerId, LedgerError> {
        check(validate_customer(&customer))?;
        let id = customer.id;
        self.store.insert_customer(customer)?;
        info!(customer = %id, "customer added");
        Ok(id)
    }

    /// Update contact details and tariff. The meter reading and creation time
    /// are owned by the ledger and are kept as stored.
    pub fn update_customer(&mut self, customer: Customer) -> Result<(), LedgerError> {
        check(validate_customer(&customer))?;
        let stored = self
            .store
            .customer(&customer.id)
            .ok_or(LedgerError::CustomerNotFound(customer.id))?;
        let id = customer.id;
        self.store.update_customer(Customer {
            last_meter_reading: stored.last_meter_reading,
            created_at: stored.created_at,
            updated_at: Some(Utc::now()),
            ..customer
        })?;
        info!(customer = %id, "customer updated");
        Ok(())
    }

    pub fn set_customer_status(
        &mut self,
        id: &CustomerId,
        status: CustomerStatus,
    ) -> Result<(), LedgerError> {
        let mut customer = self
            .store
            .customer(id)
            .ok_or(LedgerError::CustomerNotFound(*id))?;
        customer.status = status;
        customer.updated_at = Some(Utc::now());
        self.store.update_customer(customer)?;
        info!(customer = %id, ?status, "customer status changed");
        Ok(())
    }

    /// Remove a customer. Their invoices stay in the ledger.
    pub fn remove_customer(&mut self, id: &CustomerId) -> Result<Customer, LedgerError> {
        let removed = self.store.remove_customer(id)?;
        info!(customer = %id, "customer removed");
        Ok(removed)
    }

    pub fn customer(&self, id: &CustomerId) -> Option<Customer> {
        self.store.customer(id)
    }

    pub fn find_customers(&self, filter: &CustomerFilter) -> Vec<Customer> {
        self.store
            .customers()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect()
    }

    // ── Invoices ───────────────────────────────────────────────────────────

    /// Invoice builder prefilled from the customer's tariff, priced in the
    /// utility's default currency.
    ///
    /// The subscription fee is kept in USD; for a local-currency draft it is
    /// converted at the current exchange rate.
    pub fn draft_invoice(
        &self,
        customer_id: &CustomerId,
        period: BillingPeriod,
    ) -> Result<InvoiceBuilder, LedgerError> {
        let tariff = self
            .store
            .customer(customer_id)
            .map(|c| c.tariff())
            .ok_or(LedgerError::CustomerNotFound(*customer_id))?;
        let draft = InvoiceBuilder::from_tariff(*customer_id, period, &tariff, &self.settings);
        match self.settings.default_currency {
            Currency::Usd => Ok(draft.pricing_mode(PricingMode::Usd)),
            Currency::Local => {
                let fee = tariff
                    .fixed_fee
                    .checked_mul(self.settings.exchange_rate)
                    .ok_or(CalculationError::Arithmetic("local subscription fee"))?;
                Ok(draft.pricing_mode(PricingMode::Local).fixed_fee(fee))
            }
        }
    }

    /// Totals the draft would produce, without issuing anything.
    pub fn preview_invoice(&self, draft: &InvoiceBuilder) -> Result<InvoiceTotals, LedgerError> {
        let invoice = draft.clone().build("PREVIEW", &self.settings)?;
        Ok(invoice.totals)
    }

    /// Validate, calculate and commit a new invoice, advancing the customer's
    /// last meter reading in the same step.
    pub fn issue_invoice(&mut self, draft: InvoiceBuilder) -> Result<Invoice, LedgerError> {
        let customer_id = draft.customer_id();
        let customer = self
            .store
            .customer(&customer_id)
            .ok_or(LedgerError::CustomerNotFound(customer_id))?;
        if !customer.is_active() {
            warn!(customer = %customer_id, "invoice rejected for inactive customer");
            return Err(LedgerError::InactiveCustomer(customer_id));
        }

        let number = self.next_invoice_number(draft.period());
        let invoice = draft.build(number, &self.settings)?;

        if let Err(err) = self.store.commit_invoice(invoice.clone()) {
            warn!(invoice = %invoice.number, error = %err, "invoice commit failed");
            return Err(err);
        }
        info!(
            invoice = %invoice.number,
            customer = %customer_id,
            period = %invoice.period,
            total_usd = %invoice.total_usd(),
            total_local = %invoice.total_local(),
            "invoice issued"
        );
        Ok(invoice)
    }

    /// Apply `edit` to a stored invoice, then recompute and overwrite every
    /// derived total. The captured exchange rate is kept unless the edit
    /// changes it; the customer's last meter reading is not touched.
    pub fn edit_invoice(
        &mut self,
        number: &str,
        edit: impl FnOnce(&mut Invoice),
    ) -> Result<Invoice, LedgerError> {
        let original = self
            .store
            .invoice(number)
            .ok_or_else(|| LedgerError::InvoiceNotFound(number.to_string()))?;

        let mut edited = original.clone();
        edit(&mut edited);
        if edited.number != original.number {
            return Err(LedgerError::ImmutableField("number"));
        }
        if edited.customer_id != original.customer_id {
            return Err(LedgerError::ImmutableField("customer_id"));
        }
        if edited.period != original.period
            && self.store.invoices().iter().any(|i| {
                i.number != edited.number
                    && i.customer_id == edited.customer_id
                    && i.period == edited.period
            })
        {
            return Err(LedgerError::DuplicateInvoice {
                customer: edited.customer_id,
                period: edited.period,
            });
        }

        if let Err(err) = edited.recalculate() {
            warn!(invoice = %number, error = %err, "invoice edit rejected");
            return Err(err.into());
        }
        check(validate_invoice(&edited))?;

        self.store.replace_invoice(edited.clone())?;
        info!(
            invoice = %number,
            total_usd = %edited.total_usd(),
            total_local = %edited.total_local(),
            "invoice edited"
        );
        Ok(edited)
    }

    pub fn delete_invoice(&mut self, number: &str) -> Result<Invoice, LedgerError> {
        let removed = self.store.remove_invoice(number)?;
        info!(invoice = %number, "invoice deleted");
        Ok(removed)
    }

    pub fn invoice(&self, number: &str) -> Option<Invoice> {
        self.store.invoice(number)
    }

    /// Matching invoices in issue order.
    pub fn invoices(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        self.store
            .invoices()
            .into_iter()
            .filter(|i| filter.matches(i))
            .collect()
    }

    /// Matching invoices, newest first.
    pub fn history(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        let mut invoices = self.invoices(filter);
        invoices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        invoices
    }

    /// Years that have at least one invoice or expense, newest first.
    pub fn active_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .store
            .invoices()
            .iter()
            .map(|i| i.period.year())
            .chain(self.store.expenses().iter().map(|e| e.period.year()))
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        if years.is_empty() {
            years.push(Utc::now().year());
        }
        years
    }

    fn next_invoice_number(&self, period: BillingPeriod) -> String {
        let stem = format!("{}{}-", self.number_prefix, period);
        let last = self
            .store
            .invoices()
            .iter()
            .filter_map(|i| i.number.strip_prefix(&stem)?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        InvoiceNumberSequence::starting_at(self.number_prefix.clone(), period, last + 1).next_number()
    }

    // ── Expenses ───────────────────────────────────────────────────────────

    pub fn add_expense(&mut self, expense: Expense) -> Result<ExpenseId, LedgerError> {
        check(validate_expense(&expense))?;
        let id = expense.id;
        info!(
            expense = %id,
            period = %expense.period,
            amount = %expense.amount,
            currency = %expense.currency,
            "expense added"
        );
        self.store.insert_expense(expense)?;
        Ok(id)
    }

    pub fn update_expense(&mut self, expense: Expense) -> Result<(), LedgerError> {
        check(validate_expense(&expense))?;
        let id = expense.id;
        self.store.update_expense(expense)?;
        info!(expense = %id, "expense updated");
        Ok(())
    }

    pub fn delete_expense(&mut self, id: &ExpenseId) -> Result<Expense, LedgerError> {
        let removed = self.store.remove_expense(id)?;
        info!(expense = %id, "expense deleted");
        Ok(removed)
    }

    pub fn expense(&self, id: &ExpenseId) -> Option<Expense> {
        self.store.expense(id)
    }

    pub fn expenses(&self, filter: &ExpenseFilter) -> Vec<Expense> {
        self.store
            .expenses()
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    // ── Reports ────────────────────────────────────────────────────────────

    /// Income, expenses and net result for one period.
    #[cfg(feature = "reports")]
    pub fn monthly_report(
        &self,
        period: BillingPeriod,
    ) -> Result<crate::reports::MonthlyReport, LedgerError> {
        let report = crate::reports::generate_monthly_report(
            period,
            &self.store.invoices(),
            &self.store.expenses(),
            &self.store.customers(),
        );
        if let Err(err) = &report {
            warn!(period = %period, error = %err, "monthly report failed");
        }
        Ok(report?)
    }
}

fn check(errors: Vec<ValidationError>) -> Result<(), LedgerError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BillingError::from_validation(&errors).into())
    }
}
