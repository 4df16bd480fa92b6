use addonfw::TemplateStore;

/*
 * The manifest templates deploying OLM on a managed cluster, compiled into
 * the binary so the hub controller image needs nothing else.
 */
pub const NAMESPACES: &str = include_str!("../manifests/00-namespaces.yaml");
pub const RBAC: &str = include_str!("../manifests/01-rbac.yaml");
pub const OLM_OPERATOR: &str = include_str!("../manifests/02-olm-operator.yaml");
pub const CATALOG_OPERATOR: &str = include_str!("../manifests/03-catalog-operator.yaml");

pub const ALL_TEMPLATES: &[(&str, &str)] = &[
    ("manifests/00-namespaces.yaml", NAMESPACES),
    ("manifests/01-rbac.yaml", RBAC),
    ("manifests/02-olm-operator.yaml", OLM_OPERATOR),
    ("manifests/03-catalog-operator.yaml", CATALOG_OPERATOR),
];

pub fn store() -> TemplateStore {
    TemplateStore::new(ALL_TEMPLATES)
}
