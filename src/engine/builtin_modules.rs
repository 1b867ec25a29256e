// ==========================================
// 系统初始化导入中心 - 内置模块目录
// ==========================================
// 库存/采购主数据的可导入模块描述，服务启动时注册
// 依赖链: departments -> users
//         companies, drug_generics -> drugs -> drug_prices
//         budget_types -> budgets
// ==========================================

use crate::domain::module::{ColumnType, ModuleDescriptor, TemplateColumn};

/// 全部内置模块
pub fn inventory_modules() -> Vec<ModuleDescriptor> {
    vec![
        departments(),
        users(),
        locations(),
        companies(),
        drug_generics(),
        drugs(),
        drug_prices(),
        budget_types(),
        budgets(),
    ]
}

fn departments() -> ModuleDescriptor {
    ModuleDescriptor::new("departments", "core", "Departments")
        .description("Organization departments")
        .priority(1)
        .tags(&["core", "required"])
        .key_column("dept_code")
        .columns(vec![
            TemplateColumn::new("dept_code", ColumnType::String)
                .display_name("Department Code")
                .required()
                .max_length(20)
                .pattern(r"^[A-Z0-9_-]+$")
                .example("PHARM"),
            TemplateColumn::new("dept_name", ColumnType::String)
                .display_name("Department Name")
                .required()
                .max_length(120)
                .example("Pharmacy"),
            TemplateColumn::new("is_active", ColumnType::Boolean)
                .display_name("Active"),
        ])
}

fn users() -> ModuleDescriptor {
    ModuleDescriptor::new("users", "core", "Users")
        .description("System users with department assignment")
        .depends_on(&["departments"])
        .priority(2)
        .tags(&["core", "required", "users"])
        .key_column("username")
        .columns(vec![
            TemplateColumn::new("username", ColumnType::String)
                .display_name("Username")
                .required()
                .max_length(50)
                .pattern(r"^[a-zA-Z0-9_.]+$"),
            TemplateColumn::new("email", ColumnType::String)
                .display_name("Email")
                .required()
                .max_length(255)
                .pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
                .example("jane.doe@example.com"),
            TemplateColumn::new("first_name", ColumnType::String)
                .display_name("First Name")
                .max_length(100),
            TemplateColumn::new("last_name", ColumnType::String)
                .display_name("Last Name")
                .max_length(100),
            TemplateColumn::new("dept_code", ColumnType::String)
                .display_name("Department Code")
                .max_length(20),
            TemplateColumn::new("role", ColumnType::String)
                .display_name("Role")
                .one_of(&["admin", "manager", "user"])
                .deprecated(&["manager"]),
        ])
}

fn locations() -> ModuleDescriptor {
    ModuleDescriptor::new("locations", "inventory", "Storage Locations")
        .subdomain("warehouse")
        .priority(5)
        .tags(&["master-data"])
        .key_column("location_code")
        .columns(vec![
            TemplateColumn::new("location_code", ColumnType::String)
                .display_name("Location Code")
                .required()
                .max_length(20),
            TemplateColumn::new("location_name", ColumnType::String)
                .display_name("Location Name")
                .required()
                .max_length(120),
            TemplateColumn::new("location_type", ColumnType::String)
                .display_name("Type")
                .one_of(&["WAREHOUSE", "PHARMACY", "WARD"]),
        ])
}

fn companies() -> ModuleDescriptor {
    ModuleDescriptor::new("companies", "inventory", "Companies")
        .subdomain("master-data")
        .description("Manufacturers and vendors")
        .priority(10)
        .tags(&["master-data", "procurement"])
        .key_column("company_code")
        .columns(vec![
            TemplateColumn::new("company_code", ColumnType::String)
                .display_name("Company Code")
                .required()
                .max_length(20),
            TemplateColumn::new("company_name", ColumnType::String)
                .display_name("Company Name")
                .required()
                .max_length(200),
            TemplateColumn::new("tax_id", ColumnType::String)
                .display_name("Tax ID")
                .pattern(r"^[0-9]{13}$"),
            TemplateColumn::new("is_vendor", ColumnType::Boolean)
                .display_name("Vendor"),
        ])
}

fn drug_generics() -> ModuleDescriptor {
    ModuleDescriptor::new("drug_generics", "inventory", "Drug Generics")
        .subdomain("master-data")
        .priority(10)
        .tags(&["master-data", "drugs"])
        .key_column("generic_code")
        .columns(vec![
            TemplateColumn::new("generic_code", ColumnType::String)
                .display_name("Generic Code")
                .required()
                .max_length(24),
            TemplateColumn::new("generic_name", ColumnType::String)
                .display_name("Generic Name")
                .required()
                .max_length(200),
            TemplateColumn::new("dosage_form", ColumnType::String)
                .display_name("Dosage Form")
                .one_of(&["TAB", "CAP", "INJ", "SYR", "CRM"]),
        ])
}

fn drugs() -> ModuleDescriptor {
    ModuleDescriptor::new("drugs", "inventory", "Drugs")
        .subdomain("master-data")
        .description("Trade drugs linked to generics and manufacturers")
        .depends_on(&["drug_generics", "companies"])
        .priority(20)
        .tags(&["master-data", "drugs"])
        .key_column("drug_code")
        .columns(vec![
            TemplateColumn::new("drug_code", ColumnType::String)
                .display_name("Drug Code")
                .required()
                .max_length(24)
                .pattern(r"^[A-Z0-9-]+$")
                .example("PARA-500"),
            TemplateColumn::new("trade_name", ColumnType::String)
                .display_name("Trade Name")
                .required()
                .max_length(200)
                .example("Paracetamol 500mg"),
            TemplateColumn::new("generic_code", ColumnType::String)
                .display_name("Generic Code")
                .max_length(24),
            TemplateColumn::new("manufacturer_code", ColumnType::String)
                .display_name("Manufacturer Code")
                .max_length(20),
            TemplateColumn::new("unit", ColumnType::String)
                .display_name("Unit")
                .one_of(&["TAB", "CAP", "BOTTLE", "VIAL", "AMP"])
                .deprecated(&["AMP"]),
            TemplateColumn::new("pack_size", ColumnType::Integer)
                .display_name("Pack Size")
                .range(Some(1.0), Some(10_000.0)),
            TemplateColumn::new("is_active", ColumnType::Boolean)
                .display_name("Active"),
        ])
}

fn drug_prices() -> ModuleDescriptor {
    ModuleDescriptor::new("drug_prices", "inventory", "Drug Prices")
        .subdomain("pricing")
        .depends_on(&["drugs"])
        .priority(30)
        .tags(&["pricing", "drugs"])
        .key_column("price_id")
        .columns(vec![
            TemplateColumn::new("price_id", ColumnType::String)
                .display_name("Price ID")
                .required()
                .max_length(40),
            TemplateColumn::new("drug_code", ColumnType::String)
                .display_name("Drug Code")
                .required()
                .max_length(24),
            TemplateColumn::new("unit_price", ColumnType::Number)
                .display_name("Unit Price")
                .required()
                .range(Some(0.0), None)
                .example("12.50"),
            TemplateColumn::new("effective_date", ColumnType::Date)
                .display_name("Effective Date")
                .required(),
        ])
}

fn budget_types() -> ModuleDescriptor {
    ModuleDescriptor::new("budget_types", "budget", "Budget Types")
        .priority(10)
        .tags(&["budget"])
        .key_column("type_code")
        .columns(vec![
            TemplateColumn::new("type_code", ColumnType::String)
                .display_name("Type Code")
                .required()
                .max_length(10),
            TemplateColumn::new("type_name", ColumnType::String)
                .display_name("Type Name")
                .required()
                .max_length(100),
        ])
}

fn budgets() -> ModuleDescriptor {
    // 预算行由财务系统对账，导入后不允许回滚
    ModuleDescriptor::new("budgets", "budget", "Budgets")
        .depends_on(&["budget_types", "departments"])
        .priority(40)
        .tags(&["budget"])
        .supports_rollback(false)
        .key_column("budget_code")
        .columns(vec![
            TemplateColumn::new("budget_code", ColumnType::String)
                .display_name("Budget Code")
                .required()
                .max_length(30),
            TemplateColumn::new("fiscal_year", ColumnType::Integer)
                .display_name("Fiscal Year")
                .required()
                .range(Some(2000.0), Some(2100.0)),
            TemplateColumn::new("type_code", ColumnType::String)
                .display_name("Type Code")
                .required(),
            TemplateColumn::new("dept_code", ColumnType::String)
                .display_name("Department Code")
                .required(),
            TemplateColumn::new("amount", ColumnType::Number)
                .display_name("Amount")
                .required()
                .range(Some(0.0), None),
        ])
}
