//! Built-in schema for the shop database: products, carts, orders, payments,
//! subscriptions and recurring plans.

use crate::migrations::{ExistencePredicate, MigrationUnit};
use crate::seed::{SeedData, SeedValue};

pub const PRODUCTS: &str = "Products";
pub const PRODUCT_VARIANTS: &str = "ProductVariants";
pub const PRODUCT_MAIN_IMAGE: &str = "ProductMainImage";
pub const PRODUCT_SUB_IMAGES: &str = "ProductSubImages";
pub const RECURRING_PLAN_TEMPLATES: &str = "RecurringPlanTemplates";
pub const PRODUCT_RECURRING_PLANS: &str = "ProductRecurringPlans";
pub const CLIENTS: &str = "Clients";
pub const CART: &str = "Cart";
pub const ORDERS: &str = "Orders";
pub const ORDER_ITEMS: &str = "OrderItems";
pub const PAYMENTS: &str = "Payments";
pub const SUBSCRIPTIONS: &str = "Subscriptions";
pub const SUBSCRIPTION_ORDER_LINES: &str = "SubscriptionOrderLines";
pub const USER_RIGHTS: &str = "UserRights";
pub const PRODUCT_CATALOG_VIEW: &str = "ProductCatalogView";

/// Every built-in unit, in registration order.
pub fn shop_units() -> Vec<MigrationUnit> {
    vec![
        products(),
        product_variants(),
        product_main_image(),
        product_sub_images(),
        recurring_plan_templates(),
        product_recurring_plans(),
        clients(),
        cart(),
        orders(),
        order_items(),
        payments(),
        subscriptions(),
        subscription_order_lines(),
        user_rights(),
        product_catalog_view(),
    ]
}

fn products() -> MigrationUnit {
    MigrationUnit::new(PRODUCTS)
        .statement(
            "CREATE TABLE Products (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                Name TEXT NOT NULL,
                ProductType TEXT NOT NULL,
                SalesPrice DECIMAL(18,2) NOT NULL DEFAULT 0,
                CostPrice DECIMAL(18,2) NOT NULL DEFAULT 0,
                Tax DECIMAL(5,2) NOT NULL DEFAULT 0,
                CreatedByEmployeeId TEXT,
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now')),
                ModifiedAt TEXT NOT NULL DEFAULT (datetime('now')),
                IsActive INTEGER NOT NULL DEFAULT 1
            )",
        )
        .statement("CREATE INDEX IX_Products_Name ON Products(Name)")
        .exists(ExistencePredicate::table("Products"))
}

fn product_variants() -> MigrationUnit {
    MigrationUnit::new(PRODUCT_VARIANTS)
        .depends_on(PRODUCTS)
        .statement(
            "CREATE TABLE ProductVariants (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                ProductId INTEGER NOT NULL REFERENCES Products(Id) ON DELETE CASCADE,
                Attribute TEXT NOT NULL,
                Value TEXT NOT NULL,
                ExtraPrice DECIMAL(18,2) NOT NULL DEFAULT 0
            )",
        )
        .statement("CREATE INDEX IX_ProductVariants_ProductId ON ProductVariants(ProductId)")
        .exists(ExistencePredicate::table("ProductVariants"))
}

/// Column addition on an existing table.
fn product_main_image() -> MigrationUnit {
    MigrationUnit::new(PRODUCT_MAIN_IMAGE)
        .depends_on(PRODUCTS)
        .statement("ALTER TABLE Products ADD COLUMN MainImage TEXT")
        .exists(ExistencePredicate::column("Products", "MainImage"))
}

fn product_sub_images() -> MigrationUnit {
    MigrationUnit::new(PRODUCT_SUB_IMAGES)
        .depends_on(PRODUCT_MAIN_IMAGE)
        .statement(
            "CREATE TABLE ProductSubImages (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                ProductId INTEGER NOT NULL REFERENCES Products(Id) ON DELETE CASCADE,
                ImageURL TEXT NOT NULL,
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_ProductSubImages_ProductId ON ProductSubImages(ProductId)")
        .exists(ExistencePredicate::table("ProductSubImages"))
}

fn recurring_plan_templates() -> MigrationUnit {
    MigrationUnit::new(RECURRING_PLAN_TEMPLATES)
        .statement(
            "CREATE TABLE RecurringPlanTemplates (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                PlanName TEXT NOT NULL UNIQUE,
                DurationMonths INTEGER NOT NULL,
                PriceMultiplier DECIMAL(10,2) NOT NULL,
                IsActive INTEGER NOT NULL DEFAULT 1
            )",
        )
        .exists(ExistencePredicate::table("RecurringPlanTemplates"))
        .seed(
            SeedData::new(
                "RecurringPlanTemplates",
                ["PlanName", "DurationMonths", "PriceMultiplier"],
            )
            .row(["Monthly".into(), SeedValue::Integer(1), SeedValue::Real(1.00)])
            .row(["Quarterly".into(), SeedValue::Integer(3), SeedValue::Real(3.00)])
            .row(["Yearly".into(), SeedValue::Integer(12), SeedValue::Real(12.00)]),
        )
}

fn product_recurring_plans() -> MigrationUnit {
    MigrationUnit::new(PRODUCT_RECURRING_PLANS)
        .depends_on(PRODUCTS)
        .statement(
            "CREATE TABLE ProductRecurringPlans (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                ProductId INTEGER NOT NULL REFERENCES Products(Id) ON DELETE CASCADE,
                PlanName TEXT NOT NULL,
                Price DECIMAL(18,2) NOT NULL,
                MinQty INTEGER NOT NULL DEFAULT 1,
                StartDate TEXT,
                EndDate TEXT
            )",
        )
        .statement(
            "CREATE INDEX IX_ProductRecurringPlans_ProductId ON ProductRecurringPlans(ProductId)",
        )
        .exists(ExistencePredicate::table("ProductRecurringPlans"))
}

fn clients() -> MigrationUnit {
    MigrationUnit::new(CLIENTS)
        .statement(
            "CREATE TABLE Clients (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                UserId TEXT,
                ClientName TEXT NOT NULL,
                Email TEXT,
                ContactPerson TEXT,
                SubscriptionStatus TEXT NOT NULL DEFAULT 'Pending',
                CreatedBy TEXT,
                IsActive INTEGER NOT NULL DEFAULT 1,
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_Clients_UserId ON Clients(UserId)")
        .exists(ExistencePredicate::table("Clients"))
}

fn cart() -> MigrationUnit {
    MigrationUnit::new(CART)
        .depends_on(PRODUCTS)
        .depends_on(PRODUCT_VARIANTS)
        .statement(
            "CREATE TABLE Cart (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                UserId TEXT NOT NULL,
                ProductId INTEGER NOT NULL REFERENCES Products(Id),
                Quantity INTEGER NOT NULL DEFAULT 1 CHECK (Quantity > 0),
                SelectedVariantId INTEGER REFERENCES ProductVariants(Id),
                SelectedPlanName TEXT,
                AddedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_Cart_UserId ON Cart(UserId)")
        .exists(ExistencePredicate::table("Cart"))
}

fn orders() -> MigrationUnit {
    MigrationUnit::new(ORDERS)
        .statement(
            "CREATE TABLE Orders (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                UserId TEXT NOT NULL,
                TotalAmount DECIMAL(18,2) NOT NULL,
                Status TEXT NOT NULL DEFAULT 'Pending',
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_Orders_UserId ON Orders(UserId)")
        .exists(ExistencePredicate::table("Orders"))
}

fn order_items() -> MigrationUnit {
    MigrationUnit::new(ORDER_ITEMS)
        .depends_on(ORDERS)
        .depends_on(PRODUCTS)
        .statement(
            "CREATE TABLE OrderItems (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                OrderId INTEGER NOT NULL REFERENCES Orders(Id),
                ProductId INTEGER NOT NULL REFERENCES Products(Id),
                Quantity INTEGER NOT NULL,
                Price DECIMAL(18,2) NOT NULL,
                VariantId INTEGER,
                PlanName TEXT
            )",
        )
        .statement("CREATE INDEX IX_OrderItems_OrderId ON OrderItems(OrderId)")
        .exists(ExistencePredicate::table("OrderItems"))
}

fn payments() -> MigrationUnit {
    MigrationUnit::new(PAYMENTS)
        .depends_on(ORDERS)
        .statement(
            "CREATE TABLE Payments (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                UserId TEXT NOT NULL,
                OrderId INTEGER REFERENCES Orders(Id),
                StripePaymentIntentId TEXT,
                Amount DECIMAL(18,2) NOT NULL,
                Currency TEXT NOT NULL DEFAULT 'INR',
                Status TEXT NOT NULL DEFAULT 'Pending',
                PaymentMethod TEXT,
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now')),
                ModifiedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_Payments_UserId ON Payments(UserId)")
        .statement("CREATE INDEX IX_Payments_OrderId ON Payments(OrderId)")
        .statement(
            "CREATE INDEX IX_Payments_StripePaymentIntentId ON Payments(StripePaymentIntentId)",
        )
        .exists(ExistencePredicate::table("Payments"))
}

fn subscriptions() -> MigrationUnit {
    MigrationUnit::new(SUBSCRIPTIONS)
        .depends_on(CLIENTS)
        .depends_on(PRODUCTS)
        .statement(
            "CREATE TABLE Subscriptions (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                SubscriptionNumber TEXT UNIQUE,
                ClientId INTEGER REFERENCES Clients(Id),
                ProductId INTEGER REFERENCES Products(Id),
                CustomerId TEXT,
                QuotationTemplate TEXT,
                RecurringPlan TEXT,
                PaymentTerm TEXT,
                PaymentFrequency TEXT,
                Amount DECIMAL(18,2),
                TotalPrice DECIMAL(18,2),
                Salesperson TEXT,
                OrderDate TEXT,
                StartDate TEXT,
                EndDate TEXT,
                ExpirationDate TEXT,
                NextInvoiceDate TEXT,
                PaymentMethod TEXT,
                PaymentDone INTEGER NOT NULL DEFAULT 0,
                Status TEXT NOT NULL DEFAULT 'Pending',
                CreatedBy TEXT,
                IsActive INTEGER NOT NULL DEFAULT 1,
                CreatedAt TEXT NOT NULL DEFAULT (datetime('now')),
                ModifiedAt TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .statement("CREATE INDEX IX_Subscriptions_ClientId ON Subscriptions(ClientId)")
        .exists(ExistencePredicate::table("Subscriptions"))
}

fn subscription_order_lines() -> MigrationUnit {
    MigrationUnit::new(SUBSCRIPTION_ORDER_LINES)
        .depends_on(SUBSCRIPTIONS)
        .depends_on(PRODUCTS)
        .statement(
            "CREATE TABLE SubscriptionOrderLines (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                SubscriptionId INTEGER NOT NULL REFERENCES Subscriptions(Id) ON DELETE CASCADE,
                ProductId INTEGER REFERENCES Products(Id),
                ProductName TEXT,
                Quantity INTEGER NOT NULL DEFAULT 1,
                UnitPrice DECIMAL(18,2) NOT NULL DEFAULT 0,
                Discount DECIMAL(18,2) NOT NULL DEFAULT 0,
                Taxes DECIMAL(18,2) NOT NULL DEFAULT 0,
                Amount DECIMAL(18,2) NOT NULL DEFAULT 0
            )",
        )
        .statement(
            "CREATE INDEX IX_SubscriptionOrderLines_SubscriptionId
                ON SubscriptionOrderLines(SubscriptionId)",
        )
        .exists(ExistencePredicate::table("SubscriptionOrderLines"))
}

fn user_rights() -> MigrationUnit {
    MigrationUnit::new(USER_RIGHTS)
        .statement(
            "CREATE TABLE UserRights (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                UserId INTEGER NOT NULL,
                ModuleKey TEXT NOT NULL,
                CanView INTEGER NOT NULL DEFAULT 0,
                CanCreate INTEGER NOT NULL DEFAULT 0,
                CanUpdate INTEGER NOT NULL DEFAULT 0,
                CanDelete INTEGER NOT NULL DEFAULT 0,
                UNIQUE (UserId, ModuleKey)
            )",
        )
        .exists(ExistencePredicate::table("UserRights"))
}

/// Read view joining products with their image and variant counts.
fn product_catalog_view() -> MigrationUnit {
    MigrationUnit::new(PRODUCT_CATALOG_VIEW)
        .depends_on(PRODUCT_MAIN_IMAGE)
        .depends_on(PRODUCT_SUB_IMAGES)
        .depends_on(PRODUCT_VARIANTS)
        .statement(
            "CREATE VIEW vw_ProductCatalog AS
             SELECT p.Id, p.Name, p.ProductType, p.SalesPrice, p.Tax, p.MainImage,
                    (SELECT COUNT(*) FROM ProductVariants v WHERE v.ProductId = p.Id) AS VariantCount,
                    (SELECT COUNT(*) FROM ProductSubImages i WHERE i.ProductId = p.Id) AS ImageCount
             FROM Products p
             WHERE p.IsActive = 1",
        )
        .exists(ExistencePredicate::view("vw_ProductCatalog"))
}
