//! Permission catalog - the closed set of capability tags
//!
//! Every grant anywhere in the system draws from this catalog. Tags are
//! stored and transported as snake_case strings; unknown strings are
//! rejected at the boundary, never silently dropped.

use std::fmt;

use serde::de;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single capability tag.
///
/// The discriminant doubles as the bit position inside [`PermissionSet`],
/// so the catalog is capped at 16 tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageAdmins,
    ManageTariffs,
    ManageShops,
    ManageShopOwners,
    ManageAssistants,
    ManageCategories,
    ManageProducts,
    ManageOrders,
    ManageInstallments,
    ManageContracts,
    ViewStatistics,
}

impl Permission {
    /// Every tag, in catalog order.
    pub const ALL: [Permission; 11] = [
        Permission::ManageAdmins,
        Permission::ManageTariffs,
        Permission::ManageShops,
        Permission::ManageShopOwners,
        Permission::ManageAssistants,
        Permission::ManageCategories,
        Permission::ManageProducts,
        Permission::ManageOrders,
        Permission::ManageInstallments,
        Permission::ManageContracts,
        Permission::ViewStatistics,
    ];

    pub fn as_tag(self) -> &'static str {
        match self {
            Permission::ManageAdmins => "manage_admins",
            Permission::ManageTariffs => "manage_tariffs",
            Permission::ManageShops => "manage_shops",
            Permission::ManageShopOwners => "manage_shop_owners",
            Permission::ManageAssistants => "manage_assistants",
            Permission::ManageCategories => "manage_categories",
            Permission::ManageProducts => "manage_products",
            Permission::ManageOrders => "manage_orders",
            Permission::ManageInstallments => "manage_installments",
            Permission::ManageContracts => "manage_contracts",
            Permission::ViewStatistics => "view_statistics",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Permission> {
        match tag {
            "manage_admins" => Some(Permission::ManageAdmins),
            "manage_tariffs" => Some(Permission::ManageTariffs),
            "manage_shops" => Some(Permission::ManageShops),
            "manage_shop_owners" => Some(Permission::ManageShopOwners),
            "manage_assistants" => Some(Permission::ManageAssistants),
            "manage_categories" => Some(Permission::ManageCategories),
            "manage_products" => Some(Permission::ManageProducts),
            "manage_orders" => Some(Permission::ManageOrders),
            "manage_installments" => Some(Permission::ManageInstallments),
            "manage_contracts" => Some(Permission::ManageContracts),
            "view_statistics" => Some(Permission::ViewStatistics),
            _ => None,
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

const fn set_of(perms: &[Permission]) -> PermissionSet {
    let mut bits = 0u16;
    let mut i = 0;
    while i < perms.len() {
        bits |= perms[i].bit();
        i += 1;
    }
    PermissionSet { bits }
}

/// A set of capability tags, packed into a bitmask.
///
/// Serializes as a JSON array of tags in catalog order; deserializing an
/// unknown tag is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet {
    bits: u16,
}

impl PermissionSet {
    pub const EMPTY: PermissionSet = PermissionSet { bits: 0 };

    /// The whole catalog. This is the grant universe for admin targets.
    pub const FULL: PermissionSet = set_of(&Permission::ALL);

    /// Tags a shop owner may hold and pass down to assistants. The four
    /// platform-level tags (admins, tariffs, shops, shop owners) are
    /// deliberately absent.
    pub const SHOP_OWNER_DELEGATABLE: PermissionSet = set_of(&[
        Permission::ManageAssistants,
        Permission::ManageCategories,
        Permission::ManageProducts,
        Permission::ManageOrders,
        Permission::ManageInstallments,
        Permission::ManageContracts,
        Permission::ViewStatistics,
    ]);

    pub fn insert(&mut self, p: Permission) {
        self.bits |= p.bit();
    }

    pub fn contains(self, p: Permission) -> bool {
        self.bits & p.bit() != 0
    }

    pub fn union(self, other: PermissionSet) -> PermissionSet {
        PermissionSet { bits: self.bits | other.bits }
    }

    pub fn intersection(self, other: PermissionSet) -> PermissionSet {
        PermissionSet { bits: self.bits & other.bits }
    }

    /// Tags present in `self` but not in `other`.
    pub fn difference(self, other: PermissionSet) -> PermissionSet {
        PermissionSet { bits: self.bits & !other.bits }
    }

    pub fn is_subset_of(self, other: PermissionSet) -> bool {
        self.bits & !other.bits == 0
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterates in catalog order regardless of insertion order.
    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.contains(*p))
    }

    pub fn tags(self) -> Vec<&'static str> {
        self.iter().map(Permission::as_tag).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::default();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl Serialize for PermissionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for p in self.iter() {
            seq.serialize_element(p.as_tag())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tags = Vec::<String>::deserialize(deserializer)?;
        let mut set = PermissionSet::default();
        for tag in &tags {
            match Permission::from_tag(tag) {
                Some(p) => set.insert(p),
                None => return Err(de::Error::custom(format!("unknown permission tag: {tag}"))),
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegatable_subset_excludes_platform_tags() {
        assert!(PermissionSet::SHOP_OWNER_DELEGATABLE.is_subset_of(PermissionSet::FULL));
        for p in [
            Permission::ManageAdmins,
            Permission::ManageTariffs,
            Permission::ManageShops,
            Permission::ManageShopOwners,
        ] {
            assert!(!PermissionSet::SHOP_OWNER_DELEGATABLE.contains(p), "{p} must stay admin-only");
        }
        assert_eq!(PermissionSet::SHOP_OWNER_DELEGATABLE.len(), 7);
        assert_eq!(PermissionSet::FULL.len(), Permission::ALL.len());
    }

    #[test]
    fn tags_come_back_in_catalog_order() {
        let set: PermissionSet =
            [Permission::ViewStatistics, Permission::ManageAdmins].into_iter().collect();
        assert_eq!(set.tags(), vec!["manage_admins", "view_statistics"]);
    }

    #[test]
    fn unknown_tag_is_rejected_on_deserialize() {
        let err = serde_json::from_str::<PermissionSet>(r#"["manage_products", "manage_everything"]"#)
            .unwrap_err();
        assert!(err.to_string().contains("manage_everything"));
    }

    #[test]
    fn set_algebra() {
        let mine: PermissionSet =
            [Permission::ManageProducts, Permission::ManageOrders].into_iter().collect();
        let asked: PermissionSet =
            [Permission::ManageOrders, Permission::ViewStatistics].into_iter().collect();

        let over = asked.difference(mine);
        assert_eq!(over.tags(), vec!["view_statistics"]);
        assert!(asked.intersection(mine).contains(Permission::ManageOrders));
        assert!(!asked.is_subset_of(mine));
    }
}
