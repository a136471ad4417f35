//! Bundled sample schema for trying the tool without a file.

pub const SAMPLE_SCHEMA_NAME: &str = "E-commerce Database";

pub const SAMPLE_SCHEMA: &str = r#"CREATE TABLE customers (
  customer_id UUID PRIMARY KEY,
  first_name VARCHAR(50) NOT NULL,
  last_name VARCHAR(50) NOT NULL,
  email VARCHAR(100) UNIQUE NOT NULL,
  created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE orders (
  order_id UUID PRIMARY KEY,
  customer_id UUID REFERENCES customers(customer_id),
  order_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
  status VARCHAR(20) DEFAULT 'pending',
  total_amount DECIMAL(10, 2) NOT NULL
);

CREATE TABLE products (
  product_id UUID PRIMARY KEY,
  product_name VARCHAR(100) NOT NULL,
  description TEXT,
  price DECIMAL(10, 2) NOT NULL,
  category VARCHAR(50),
  inventory_count INTEGER DEFAULT 0
);

CREATE TABLE order_items (
  item_id UUID PRIMARY KEY,
  order_id UUID REFERENCES orders(order_id),
  product_id UUID REFERENCES products(product_id),
  quantity INTEGER NOT NULL CHECK (quantity > 0),
  unit_price DECIMAL(10, 2) NOT NULL
);
"#;
