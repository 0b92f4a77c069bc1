use super::{ProductSource, SourceFuture};
use super::{Product, RequestDescriptor, ResponsePage, SortKey};
use std::sync::Arc;
use std::time::Duration;

/// Size of the built-in catalog.
const CATALOG_SIZE: u64 = 48;

/// The first dozen products are priced low so cheap price bands are never empty.
const LOW_PRICE_COUNT: u64 = 12;

/// Categories and brands of the built-in catalog, also offered as filter choices.
pub const CATEGORIES: [&str; 4] = ["Electronics", "Apparel", "Home", "Grocery"];
pub const BRANDS: [&str; 4] = ["Brand A", "Brand B", "Brand C", "Brand D"];
const TAGS: [&str; 3] = ["bestseller", "new", "recommended"];

/// Deterministic in-memory catalog.
///
/// Every query is evaluated against the full product list on each call, so
/// the result reflects the request exactly; nothing is memoized here.
#[derive(Clone)]
pub struct MockCatalog {
    products: Arc<[Product]>,
    latency: Duration,
}

impl MockCatalog {
    /// The built-in 48-product catalog with no simulated latency.
    pub fn new() -> Self {
        Self::with_products((1..=CATALOG_SIZE).map(seed_product).collect())
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: products.into(),
            latency: Duration::ZERO,
        }
    }

    /// Delay every response by `latency` (uses the tokio clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Evaluate `request` synchronously.
    pub fn query(&self, request: &RequestDescriptor) -> ResponsePage {
        evaluate(&self.products, request)
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductSource for MockCatalog {
    fn fetch_products(&self, request: &RequestDescriptor) -> SourceFuture {
        let products = Arc::clone(&self.products);
        let latency = self.latency;
        let request = request.clone();

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let page = evaluate(&products, &request);
            tracing::trace!(
                page = request.page,
                returned = page.products.len(),
                total = page.total,
                "Mock catalog answered"
            );
            Ok(page)
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn evaluate(products: &[Product], request: &RequestDescriptor) -> ResponsePage {
    let filters = &request.filters;
    let needle = filters.search.to_lowercase();

    let mut matched: Vec<&Product> = products
        .iter()
        .filter(|p| filters.category.is_empty() || p.category == filters.category)
        .filter(|p| filters.brand.is_empty() || p.brand == filters.brand)
        .filter(|p| filters.price_range.contains(p.price))
        .filter(|p| !filters.in_stock || p.in_stock)
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .collect();

    // Stable sorts: ties keep catalog order.
    match request.sort {
        SortKey::PriceAsc => matched.sort_by_key(|p| p.price),
        SortKey::PriceDesc => matched.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::Sales => matched.sort_by(|a, b| b.sales.cmp(&a.sales)),
        SortKey::Rating => matched.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortKey::Default => matched.sort_by(|a, b| b.id.cmp(&a.id)),
    }

    let len = matched.len();
    if len > 0 {
        let rotate_by = (u128::from(request.feed_seed) * u128::from(request.page_size)
            % len as u128) as usize;
        matched.rotate_left(rotate_by);
    }

    let start = (request.page.saturating_sub(1) as usize).saturating_mul(request.page_size as usize);
    let products = matched
        .into_iter()
        .skip(start)
        .take(request.page_size as usize)
        .cloned()
        .collect();

    ResponsePage {
        products,
        total: len as u64,
    }
}

/// SplitMix64 finalizer; gives stable pseudo-random attributes per product.
fn mix(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn roll(id: u64, salt: u64, modulus: u64) -> u64 {
    mix(id.wrapping_mul(31).wrapping_add(salt)) % modulus
}

fn seed_product(id: u64) -> Product {
    let index = (id - 1) as usize;
    let price = (if id <= LOW_PRICE_COUNT {
        50 + roll(id, 1, 300)
    } else {
        100 + roll(id, 1, 1000)
    }) as u32;
    let name = format!("Product{id}");

    Product {
        id,
        description: format!("Detailed description of {name}, priced at ¥{price}."),
        name,
        price,
        original_price: Some(price + 50 + roll(id, 2, 200) as u32),
        category: CATEGORIES[index % CATEGORIES.len()].to_string(),
        brand: BRANDS[index % BRANDS.len()].to_string(),
        image: Some(format!("https://picsum.photos/200/200?random={id}")),
        // One in five is out of stock.
        in_stock: index % 5 != 3,
        rating: 3.0 + roll(id, 3, 21) as f32 / 10.0,
        review_count: roll(id, 4, 500) as u32,
        sales: roll(id, 5, 1000) as u32,
        tags: vec![TAGS[roll(id, 6, TAGS.len() as u64) as usize].to_string()],
    }
}
