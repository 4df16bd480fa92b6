use crate::errors::{Error, Result};
use crate::values::Values;

use minijinja::AutoEscape;
use minijinja::Environment;
use serde::Deserialize;

/*
 * TemplateStore holds manifest templates embedded in the binary as
 * (path, source) pairs, e.g. ("manifests/olm-operator.yaml", include_str!(..)).
 */
#[derive(Clone, Debug, Default)]
pub struct TemplateStore {
    templates: Vec<(&'static str, &'static str)>,
}

impl TemplateStore {

    pub fn new(templates: &[(&'static str, &'static str)]) -> Self {
	Self{
	    templates: templates.to_vec(),
	}
    }

    /*
     * Returns the templates located below `dir`, sorted by path.
     */
    pub fn under(&self, dir: &str) -> Vec<(&'static str, &'static str)> {
	let prefix = format!("{}/", dir.trim_end_matches('/'));
	let mut selected: Vec<(&'static str, &'static str)> = self.templates.iter()
	    .filter(|(path, _)| path.starts_with(&prefix))
	    .copied()
	    .collect();

	selected.sort_by_key(|(path, _)| *path);
	selected
    }
}

/*
 * ManifestRenderer compiles a set of templates once and renders them into
 * kubernetes objects for a given set of values.
 */
pub struct ManifestRenderer {
    env: Environment<'static>,
    names: Vec<&'static str>,
}

impl ManifestRenderer {

    pub fn new(templates: Vec<(&'static str, &'static str)>) -> Result<Self> {
	let mut env = Environment::new();
	env.set_auto_escape_callback(|_| AutoEscape::None);
	env.set_keep_trailing_newline(true);

	let mut names = Vec::with_capacity(templates.len());
	for (name, source) in templates {
	    env.add_template(name, source)?;
	    names.push(name);
	}

	Ok(Self{
	    env: env,
	    names: names,
	})
    }

    pub fn templates(&self) -> &[&'static str] {
	&self.names
    }

    /*
     * Renders every template, in order, and returns the objects they hold.
     */
    pub fn render(&self, values: &Values) -> Result<Vec<serde_json::Value>> {
	let mut objects = vec![];

	for name in &self.names {
	    let rendered = self.env.get_template(name)?.render(values)?;
	    objects.append(&mut parse_documents(name, &rendered)?);
	}

	Ok(objects)
    }
}

fn invalid_manifest(template: &str, reason: impl Into<String>) -> Error {
    Error::Manifest{
	template: template.to_string(),
	reason: reason.into(),
    }
}

/*
 * Splits a rendered template into its YAML documents. Empty documents are
 * skipped; the others must be kubernetes objects carrying apiVersion and kind.
 */
pub fn parse_documents(template: &str, rendered: &str) -> Result<Vec<serde_json::Value>> {
    let mut objects = vec![];

    for document in serde_yaml::Deserializer::from_str(rendered) {
	let object = serde_json::Value::deserialize(document)
	    .map_err(|err| invalid_manifest(template, err.to_string()))?;

	match &object {
	    serde_json::Value::Null => continue,
	    serde_json::Value::Object(fields) => {
		for required in ["apiVersion", "kind"] {
		    if !fields.get(required).map_or(false, |v| v.is_string()) {
			return Err(invalid_manifest(template, format!("missing `{}`", required)));
		    }
		}
	    },
	    _ => return Err(invalid_manifest(template, "document is not an object")),
	}
	objects.push(object);
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMESPACE: &str = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {{ Namespace }}\n";
    const PAIR: &str = "---\napiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: a\n---\n# nothing here\n---\napiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: b\n";

    #[test]
    fn store_selects_by_directory() {
	let store = TemplateStore::new(&[
	    ("manifests/02-b.yaml", ""),
	    ("other/a.yaml", ""),
	    ("manifests/01-a.yaml", ""),
	    ("manifestsx/c.yaml", ""),
	]);

	let names: Vec<&str> = store.under("manifests").into_iter().map(|(name, _)| name).collect();
	assert_eq!(names, vec!["manifests/01-a.yaml", "manifests/02-b.yaml"]);
	assert_eq!(store.under("manifests/").len(), 2);
	assert!(store.under("missing").is_empty());
    }

    #[test]
    fn renders_values_into_objects() {
	let renderer = ManifestRenderer::new(vec![("manifests/ns.yaml", NAMESPACE), ("manifests/sa.yaml", PAIR)]).unwrap();
	let mut values = Values::new();
	values.insert(String::from("Namespace"), String::from("olm"));

	let objects = renderer.render(&values).unwrap();
	assert_eq!(objects.len(), 3);
	assert_eq!(objects[0]["metadata"]["name"], "olm");
	assert_eq!(objects[1]["metadata"]["name"], "a");
	assert_eq!(objects[2]["metadata"]["name"], "b");
    }

    #[test]
    fn inline_json_values_are_yaml() {
	let template = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nspec:\n{%- if NodeSelector is defined %}\n  nodeSelector: {{ NodeSelector }}\n{%- endif %}\n  priority: {{ Priority | default(\"0\") }}\n";
	let renderer = ManifestRenderer::new(vec![("manifests/pod.yaml", template)]).unwrap();

	let mut values = Values::new();
	values.insert(String::from("NodeSelector"), String::from(r#"{"kubernetes.io/os":"linux"}"#));
	let objects = renderer.render(&values).unwrap();
	assert_eq!(objects[0]["spec"]["nodeSelector"]["kubernetes.io/os"], "linux");
	assert_eq!(objects[0]["spec"]["priority"], 0);

	let objects = renderer.render(&Values::new()).unwrap();
	assert!(objects[0]["spec"].get("nodeSelector").is_none());
    }

    #[test]
    fn invalid_template_is_rejected_at_build() {
	assert!(ManifestRenderer::new(vec![("manifests/bad.yaml", "{% if %}")]).is_err());
    }

    #[test]
    fn documents_must_be_kubernetes_objects() {
	let err = parse_documents("t.yaml", "metadata:\n  name: x\n").unwrap_err();
	assert!(err.to_string().contains("missing `apiVersion`"));

	assert!(parse_documents("t.yaml", "- a\n- b\n").is_err());
	assert!(parse_documents("t.yaml", "kind: [").is_err());
	assert!(parse_documents("t.yaml", "").unwrap().is_empty());
    }
}
