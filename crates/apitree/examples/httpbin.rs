// httpbin example - Walking a live API through a reference tree
//
// This example demonstrates:
// - Building a root resource for a base endpoint
// - Descending to child paths, including numeric segments
// - Validated + Serialized response processing
// - Posting form data
//
// Requires network access to https://httpbin.org.

use apitree::{Params, Resource, Serialized, Validated};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let api = Resource::builder("https://httpbin.org")
		.accept("application/json")
		.stage(Validated)
		.stage(Serialized::with_defaults())
		.build()?;

	// GET https://httpbin.org/json
	println!("🌳 GET {}", api.child("json")?);
	let slideshow = api.child("json")?.get(Params::new()).await?;
	let value = slideshow.into_value().expect("deserialized structure");
	println!("   slideshow author: {}", value["slideshow"]["author"]);

	// Query parameters ride along on GET.
	let echoed = api
		.child("get")?
		.get(Params::new().set("page", 2).set("limit", 50))
		.await?;
	let value = echoed.into_value().expect("deserialized structure");
	println!("   echoed query: {}", value["args"]);

	// POST form data; httpbin echoes it back under "form".
	let created = api
		.child("post")?
		.post(Params::new().set("name", "Ada").set("role", "admin"))
		.await?;
	let value = created.into_value().expect("deserialized structure");
	println!("   echoed form: {}", value["form"]);

	// Numeric descent for variable path elements; raw verbs skip the
	// pipeline entirely, so even an error status comes back as a response.
	let code = 418;
	let raw = api.at("status").at(code).delete(Params::new()).await?;
	println!("   DELETE /status/{} -> {}", code, raw.status);

	Ok(())
}
