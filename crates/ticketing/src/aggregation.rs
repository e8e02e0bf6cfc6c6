//! Daily aggregation over orders
//!
//! A day is the half-open window `[00:00, next 00:00)` in the configured
//! local offset, matched against order creation time. The live path never
//! fails: a broken order scan yields an empty summary, and broken vendor or
//! item lookups only blank their own part. Reports use the strict path.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use common::{Clock, Money};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::CatalogGateway;
use crate::error::Result;
use crate::pricing::split_inclusive_tax;
use crate::store::{OrderQuery, OrderStore};
use crate::types::{Order, OrderStatus};

/// Fallback VAT rate used to derive tax when no order recorded any
pub const DEFAULT_VAT_RATE: f64 = 16.0;
/// Default length of `latest_orders`
pub const DEFAULT_LATEST_LIMIT: usize = 12;

/// Sales of one vendor over the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSales {
    pub vendor_id: Uuid,
    /// `None` when the catalog no longer knows the vendor
    pub vendor_name: Option<String>,
    pub total: Money,
    pub orders: u64,
}

/// Best-selling item by quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopItem {
    pub name: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestOrder {
    pub order_id: Uuid,
    pub order_code: String,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for LatestOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            order_code: order.order_code.clone(),
            status: order.status,
            total: order.total,
            created_at: order.created_at,
        }
    }
}

/// Operational and financial summary of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub date: NaiveDate,
    pub orders_count: u64,
    pub revenue: Money,
    pub tax: Money,
    pub active_orders: u64,
    pub avg_prep_minutes: Option<f64>,
    pub vendor_sales: Vec<VendorSales>,
    pub top_vendor: Option<VendorSales>,
    pub top_item: Option<TopItem>,
    pub latest_orders: Vec<LatestOrder>,
}

impl Summary {
    /// The all-zero summary
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            orders_count: 0,
            revenue: Money::ZERO,
            tax: Money::ZERO,
            active_orders: 0,
            avg_prep_minutes: None,
            vendor_sales: Vec::new(),
            top_vendor: None,
            top_item: None,
            latest_orders: Vec::new(),
        }
    }
}

/// UTC bounds of a local calendar day
pub fn day_window(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(
        &(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))),
    );
    (start, start + Duration::days(1))
}

/// Recorded tax when any order carries some, otherwise the VAT-inclusive
/// share of revenue at `vat_rate`
pub fn window_tax(orders: &[Order], revenue: Money, vat_rate: f64) -> Money {
    if orders.iter().any(|o| !o.tax.is_zero()) {
        orders.iter().map(|o| o.tax).sum()
    } else {
        split_inclusive_tax(revenue, vat_rate).1
    }
}

/// Mean preparation time over orders with usable timestamps
pub fn average_prep_minutes(orders: &[Order]) -> Option<f64> {
    let samples: Vec<f64> = orders.iter().filter_map(Order::prep_minutes).collect();
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Per-vendor totals, largest first; ties keep first-seen order
pub fn vendor_totals(orders: &[Order]) -> Vec<(Uuid, Money, u64)> {
    let mut totals: Vec<(Uuid, Money, u64)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for order in orders {
        match index.get(&order.vendor_id) {
            Some(&i) => {
                totals[i].1 += order.total;
                totals[i].2 += 1;
            }
            None => {
                index.insert(order.vendor_id, totals.len());
                totals.push((order.vendor_id, order.total, 1));
            }
        }
    }

    // sort_by is stable
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
}

/// Largest summed quantity by item name; ties keep the first-seen name
pub fn top_item<'a>(items: impl IntoIterator<Item = (&'a str, u32)>) -> Option<TopItem> {
    let mut names: Vec<&str> = Vec::new();
    let mut quantities: HashMap<&str, u64> = HashMap::new();

    for (name, quantity) in items {
        let entry = quantities.entry(name).or_insert_with(|| {
            names.push(name);
            0
        });
        *entry += u64::from(quantity);
    }

    let mut best: Option<(&str, u64)> = None;
    for name in names {
        let quantity = quantities[name];
        if best.map_or(true, |(_, q)| quantity > q) {
            best = Some((name, quantity));
        }
    }

    best.map(|(name, quantity)| TopItem {
        name: name.to_string(),
        quantity,
    })
}

/// Read-only aggregation over the store
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogGateway>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    vat_rate: f64,
    latest_limit: usize,
}

impl AggregationEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogGateway>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            offset,
            vat_rate: DEFAULT_VAT_RATE,
            latest_limit: DEFAULT_LATEST_LIMIT,
        }
    }

    pub fn with_vat_rate(mut self, vat_rate: f64) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn with_latest_limit(mut self, limit: usize) -> Self {
        self.latest_limit = limit;
        self
    }

    /// Current calendar day in the local offset
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Summary for `date` (today by default); never fails
    pub async fn summarize(&self, date: Option<NaiveDate>) -> Summary {
        let date = date.unwrap_or_else(|| self.today());
        match self.compute(date, false).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(%date, error = %err, "summary degraded to empty");
                Summary::empty(date)
            }
        }
    }

    /// Summary for `date` where any load failure is an error
    pub async fn summarize_strict(&self, date: Option<NaiveDate>) -> Result<Summary> {
        let date = date.unwrap_or_else(|| self.today());
        self.compute(date, true).await
    }

    async fn compute(&self, date: NaiveDate, strict: bool) -> Result<Summary> {
        let (from, before) = day_window(date, self.offset);
        let orders = self
            .store
            .list_orders(&OrderQuery::new().with_window(from, before))
            .await?;

        debug!(%date, orders = orders.len(), "aggregating day");
        if orders.is_empty() {
            return Ok(Summary::empty(date));
        }

        let revenue: Money = orders.iter().map(|o| o.total).sum();
        let tax = window_tax(&orders, revenue, self.vat_rate);
        let active_orders = orders.iter().filter(|o| o.is_active()).count() as u64;

        // Vendor names and order lines are independent reads
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.order_id).collect();
        let (vendor_sales, items) = futures::join!(
            self.vendor_sales(&orders),
            self.store.list_items(&order_ids)
        );

        let vendor_sales = match vendor_sales {
            Ok(sales) => sales,
            Err(err) if !strict => {
                warn!(%date, error = %err, "vendor names unavailable, omitting vendor sales");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let top_item = match items {
            Ok(items) => top_item(items.iter().map(|i| (i.name.as_str(), i.quantity))),
            Err(err) if !strict => {
                warn!(%date, error = %err, "order items unavailable, omitting top item");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let latest_orders = orders
            .iter()
            .rev()
            .take(self.latest_limit)
            .map(LatestOrder::from)
            .collect();

        Ok(Summary {
            date,
            orders_count: orders.len() as u64,
            revenue,
            tax,
            active_orders,
            avg_prep_minutes: average_prep_minutes(&orders),
            top_vendor: vendor_sales.first().cloned(),
            vendor_sales,
            top_item,
            latest_orders,
        })
    }

    async fn vendor_sales(&self, orders: &[Order]) -> Result<Vec<VendorSales>> {
        let totals = vendor_totals(orders);
        let ids: Vec<Uuid> = totals.iter().map(|(id, _, _)| *id).collect();
        let names: HashMap<Uuid, String> = self
            .catalog
            .get_vendors(&ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();

        Ok(totals
            .into_iter()
            .map(|(vendor_id, total, count)| VendorSales {
                vendor_id,
                vendor_name: names.get(&vendor_id).cloned(),
                total,
                orders: count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::TicketingError;
    use crate::store::InMemoryStore;
    use crate::types::{Actor, OrderEvent, OrderItem, PaymentMethod, Ticket};
    use assert_matches::assert_matches;
    use common::ManualClock;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn local(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        offset()
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        catalog: Arc<InMemoryCatalog>,
        engine: AggregationEngine,
        ticket: Ticket,
        seq: u16,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            let catalog = Arc::new(InMemoryCatalog::new());
            let clock = Arc::new(ManualClock::new(local(day(), 15, 0)));
            let ticket = Ticket::open("T-1000".into(), local(day(), 8, 0));
            store.insert_ticket(&ticket).await.unwrap();
            let engine = AggregationEngine::new(store.clone(), catalog.clone(), clock, offset());
            Self {
                store,
                catalog,
                engine,
                ticket,
                seq: 1000,
            }
        }

        async fn place(
            &mut self,
            vendor_id: Uuid,
            at: DateTime<Utc>,
            lines: &[(&str, i64, u32)],
            tax: i64,
        ) -> Order {
            self.seq += 1;
            let order_id = Uuid::new_v4();
            let items: Vec<OrderItem> = lines
                .iter()
                .map(|(name, price, qty)| OrderItem {
                    item_id: Uuid::new_v4(),
                    order_id,
                    menu_item_id: Uuid::new_v4(),
                    name: name.to_string(),
                    unit_price: Money::from_minor(*price),
                    quantity: *qty,
                    notes: None,
                })
                .collect();
            let total: Money = items.iter().filter_map(|i| i.line_total()).sum();
            let order = Order {
                order_id,
                order_code: format!("O-{}", self.seq),
                vendor_id,
                ticket_id: self.ticket.ticket_id,
                total,
                net: total - Money::from_minor(tax),
                tax: Money::from_minor(tax),
                tax_rate: if tax > 0 { 16.0 } else { 0.0 },
                status: OrderStatus::Preparing,
                payment_method: PaymentMethod::Cash,
                preparing_at: Some(at),
                ready_at: None,
                collected_at: None,
                created_at: at,
            };
            let event = OrderEvent::new(order_id, None, OrderStatus::Preparing, Actor::Cashier, at);
            self.store.insert_order(&order, &items, &event).await.unwrap();
            order
        }
    }

    #[test]
    fn test_day_window_uses_local_offset() {
        let (from, before) = day_window(day(), offset());
        assert_eq!(from.to_rfc3339(), "2024-04-30T22:00:00+00:00");
        assert_eq!(before - from, Duration::days(1));
    }

    #[test]
    fn test_top_item_tie_keeps_first_name() {
        let top = top_item([("Chips", 2), ("Stew", 1), ("Stew", 1), ("Soda", 1)]).unwrap();
        assert_eq!(top, TopItem { name: "Chips".into(), quantity: 2 });
        assert!(top_item(std::iter::empty()).is_none());
    }

    #[tokio::test]
    async fn test_empty_day() {
        let f = Fixture::new().await;
        let summary = f.engine.summarize(Some(day())).await;
        assert_eq!(summary, Summary::empty(day()));
    }

    #[tokio::test]
    async fn test_day_summary() {
        let mut f = Fixture::new().await;
        let grill = f.catalog.add_vendor("Mama Grill");
        let curry = f.catalog.add_vendor("Curry Corner");
        let juice = f.catalog.add_vendor("Juice Bar");

        let first = f.place(curry, local(day(), 9, 0), &[("Samosa", 300, 4)], 0).await;
        f.place(grill, local(day(), 10, 0), &[("Stew", 1000, 2), ("Chips", 500, 1)], 0).await;
        f.place(juice, local(day(), 11, 0), &[("Mango", 600, 2)], 0).await;
        f.place(grill, local(day(), 12, 0), &[("Chips", 500, 3)], 0).await;
        // outside the window on both sides
        f.place(grill, local(day(), 0, 0) - Duration::minutes(1), &[("Stew", 1000, 9)], 0).await;
        f.place(grill, local(day(), 0, 0) + Duration::days(1), &[("Stew", 1000, 9)], 0).await;

        f.store
            .transition_status(first.order_id, OrderStatus::Preparing, OrderStatus::Ready, local(day(), 9, 12))
            .await
            .unwrap();
        f.store
            .transition_status(first.order_id, OrderStatus::Ready, OrderStatus::Collected, local(day(), 9, 20))
            .await
            .unwrap();

        let summary = f.engine.summarize(Some(day())).await;
        assert_eq!(summary.orders_count, 4);
        assert_eq!(summary.revenue, Money::from_minor(6400));
        assert_eq!(summary.active_orders, 3);
        assert_eq!(summary.avg_prep_minutes, Some(12.0));

        // no recorded tax, so 16% VAT is derived: 6400 - round(6400 / 1.16)
        assert_eq!(summary.tax, Money::from_minor(6400 - 5517));

        let totals: Vec<i64> = summary.vendor_sales.iter().map(|v| v.total.minor()).collect();
        assert_eq!(totals, vec![4000, 1200, 1200]);
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(totals.iter().sum::<i64>(), summary.revenue.minor());
        // tie between curry and juice keeps first-seen order
        assert_eq!(summary.vendor_sales[1].vendor_id, curry);
        assert_eq!(summary.vendor_sales[2].vendor_id, juice);
        assert_eq!(summary.top_vendor.as_ref().and_then(|v| v.vendor_name.as_deref()), Some("Mama Grill"));

        assert_eq!(summary.top_item, Some(TopItem { name: "Samosa".into(), quantity: 4 }));

        let codes: Vec<&str> = summary.latest_orders.iter().map(|o| o.order_code.as_str()).collect();
        assert_eq!(codes, vec!["O-1004", "O-1003", "O-1002", "O-1001"]);
    }

    #[tokio::test]
    async fn test_recorded_tax_is_trusted() {
        let mut f = Fixture::new().await;
        let grill = f.catalog.add_vendor("Mama Grill");
        f.place(grill, local(day(), 10, 0), &[("Stew", 1000, 2), ("Chips", 500, 1)], 345).await;
        f.place(grill, local(day(), 11, 0), &[("Chips", 500, 2)], 0).await;

        let summary = f.engine.summarize(Some(day())).await;
        assert_eq!(summary.tax, Money::from_minor(345));
    }

    #[tokio::test]
    async fn test_latest_orders_limit() {
        let mut f = Fixture::new().await;
        let grill = f.catalog.add_vendor("Mama Grill");
        for minute in 0..15 {
            f.place(grill, local(day(), 10, minute), &[("Chips", 500, 1)], 0).await;
        }

        let summary = f.engine.clone().with_latest_limit(12).summarize(None).await;
        assert_eq!(summary.latest_orders.len(), 12);
        assert_eq!(summary.latest_orders[0].order_code, "O-1015");
    }

    #[tokio::test]
    async fn test_degraded_paths() {
        let mut f = Fixture::new().await;
        let grill = f.catalog.add_vendor("Mama Grill");
        f.place(grill, local(day(), 10, 0), &[("Chips", 500, 3)], 0).await;

        f.catalog.fail_vendor_lookups(true);
        f.store.fail_item_scan(true);
        let summary = f.engine.summarize(Some(day())).await;
        assert_eq!(summary.orders_count, 1);
        assert!(summary.vendor_sales.is_empty());
        assert!(summary.top_vendor.is_none());
        assert!(summary.top_item.is_none());
        assert_eq!(summary.latest_orders.len(), 1);

        assert_matches!(
            f.engine.summarize_strict(Some(day())).await,
            Err(TicketingError::Internal(_))
        );

        f.store.fail_order_scan(true);
        assert_eq!(f.engine.summarize(Some(day())).await, Summary::empty(day()));
    }
}
