use std::collections::BTreeMap;

use crate::{
    schema::{Primitive, TypeRef},
    ErrorCode, HttpVerb, MethodDescriptor, MethodKind, Reflect,
};

use super::{
    GenerateConfig, Manifest, RenderError, ResolvedNames, TypeGraph, TypeScript, Validation,
};

const RUNTIME: &str = r#"export type Unsubscribe = () => void;

/** A call to a live method. Nothing is sent until `subscribe` is called. */
export interface LiveSubscription<T> {
  subscribe(onValue: (value: T) => void, onError?: (error: RpcError) => void): Unsubscribe;
}

/** An error returned by a method. The code, message and details are the ones sent by the server. */
export class RpcError extends Error {
  readonly code: ErrorCode;
  readonly details: unknown;

  constructor(code: ErrorCode, message: string, details?: unknown) {
    super(message);
    this.name = "RpcError";
    this.code = code;
    this.details = details ?? null;
  }

  static from(value: unknown): RpcError {
    if (value instanceof RpcError) return value;
    if (typeof value === "object" && value !== null && "code" in value && "message" in value) {
      const { code, message, details } = value as { code: ErrorCode; message: string; details?: unknown };
      return new RpcError(code, message, details);
    }
    return new RpcError("unknown", String(value));
  }

  toJSON(): { code: ErrorCode; message: string; details: unknown } {
    return { code: this.code, message: this.message, details: this.details };
  }
}

/** Moves calls between the client and the server. */
export interface Transport {
  call(key: MethodKey, verb: Verb, input: unknown): Promise<unknown>;
  subscribe(
    key: MethodKey,
    input: unknown,
    onValue: (value: unknown) => void,
    onError: (error: RpcError) => void,
  ): Unsubscribe;
}

/** Decode a response, reporting a payload which doesn't match its type as an `RpcError`. */
function decodeWith<T>(key: MethodKey, decode: () => T): T {
  try {
    return decode();
  } catch (cause) {
    throw new RpcError("internal", `invalid response from "${key}"`, { cause: String(cause) });
  }
}

/** Decode a pushed value, routing any failure to `onError` instead of the event loop. */
function forward<T>(
  key: MethodKey,
  decode: () => T,
  onValue: (value: T) => void,
  onError: (error: RpcError) => void,
): void {
  let value: T;
  try {
    value = decodeWith(key, decode);
  } catch (err) {
    onError(RpcError.from(err));
    return;
  }
  onValue(value);
}

/** A transport calling `<baseUrl>/<Service.Method>` with `fetch` and subscribing with `EventSource`. */
export function httpTransport(
  baseUrl: string,
  options: { fetch?: typeof fetch; headers?: Record<string, string> } = {},
): Transport {
  const doFetch = options.fetch ?? fetch;
  const url = (key: string) => `${baseUrl.replace(/\/$/, "")}/${key}`;
  const query = (input: unknown) => `?input=${encodeURIComponent(JSON.stringify(input))}`;

  return {
    async call(key, verb, input) {
      let response: Response;
      try {
        response =
          verb === "GET"
            ? await doFetch(url(key) + query(input), { method: verb, headers: options.headers })
            : await doFetch(url(key), {
                method: verb,
                headers: { "content-type": "application/json", ...options.headers },
                body: JSON.stringify(input),
              });
      } catch (cause) {
        throw new RpcError("unavailable", `request to "${key}" failed`, { cause: String(cause) });
      }
      const body: unknown = await response.json().catch(() => null);
      if (!response.ok) {
        throw RpcError.from(body ?? { code: "unknown", message: response.statusText });
      }
      return body;
    },
    subscribe(key, input, onValue, onError) {
      const source = new EventSource(url(key) + query(input));
      source.onmessage = (event) => {
        let value: unknown;
        try {
          value = JSON.parse(event.data);
        } catch (cause) {
          onError(new RpcError("internal", `invalid message from "${key}"`, { cause: String(cause) }));
          return;
        }
        onValue(value);
      };
      source.addEventListener("error", (event) => {
        const data = (event as MessageEvent).data;
        let error = new RpcError("unavailable", "connection lost");
        if (data) {
          try {
            error = RpcError.from(JSON.parse(data));
          } catch (cause) {
            error = new RpcError("internal", `invalid error from "${key}"`, { cause: String(cause) });
          }
        }
        onError(error);
        source.close();
      });
      return () => source.close();
    },
  };
}
"#;

/// Renders `client.ts`: one member per method, grouped by service.
#[derive(Debug, Clone, Copy)]
pub struct ClientEmitter<'a> {
    config: &'a GenerateConfig,
    ts: TypeScript<'a>,
}

impl<'a> ClientEmitter<'a> {
    pub fn new(config: &'a GenerateConfig, names: &'a ResolvedNames) -> Self {
        Self {
            config,
            ts: TypeScript::new(config, names).namespace("t"),
        }
    }

    pub fn render(&self, graph: &TypeGraph, manifest: &Manifest) -> Result<String, RenderError> {
        let zod = self.config.validation == Validation::Zod;

        let mut out = super::preamble(self.config);
        if zod {
            out.push_str("import { z } from \"zod\";\n");
            out.push_str("import * as t from \"./types\";\n");
        } else {
            out.push_str("import type * as t from \"./types\";\n");
        }
        out.push_str("import { manifest, type MethodKey } from \"./manifest\";\n\n");

        out.push_str(&format!(
            "export type ErrorCode = {};\n\n",
            self.inline(ErrorCode::reflect())?
        ));
        out.push_str(&format!(
            "export type Verb = {};\n\n",
            self.inline(HttpVerb::reflect())?
        ));
        out.push_str(RUNTIME);

        let mut services = BTreeMap::<&str, Vec<&MethodDescriptor>>::new();
        for method in graph.methods() {
            services.entry(method.service()).or_default().push(method);
        }

        out.push_str("\nexport interface Client {\n");
        for (service, methods) in &services {
            out.push_str(&format!("  {service}: {{\n"));
            for method in methods {
                out.push_str(&self.signature(method)?);
            }
            out.push_str("  };\n");
        }
        out.push_str("}\n");

        out.push_str("\nexport function createClient(transport: Transport): Client {\n  return {\n");
        for (service, methods) in &services {
            out.push_str(&format!("    {service}: {{\n"));
            for method in methods {
                out.push_str(&self.member(method, manifest, zod)?);
            }
            out.push_str("    },\n");
        }
        out.push_str("  };\n}\n");

        Ok(out)
    }

    fn signature(&self, method: &MethodDescriptor) -> Result<String, RenderError> {
        let key = method.key();
        let request = self.ts.reference(method.request(), &format!("{key}.request"))?;
        let response = self.ts.reference(method.response(), &format!("{key}.response"))?;
        let input = match method.request() {
            TypeRef::Primitive(Primitive::Unit) => format!("input?: {request}"),
            _ => format!("input: {request}"),
        };
        let output = match method.kind() {
            MethodKind::Unary => format!("Promise<{response}>"),
            MethodKind::Live => format!("LiveSubscription<{response}>"),
        };

        Ok(format!(
            "    /** `{} {key}` */\n    {}({input}): {output};\n",
            method.verb(),
            method.method()
        ))
    }

    fn member(
        &self,
        method: &MethodDescriptor,
        manifest: &Manifest,
        zod: bool,
    ) -> Result<String, RenderError> {
        let key = method.key();
        let path = format!("{key}.response");
        let response = self.ts.reference(method.response(), &path)?;
        let decode = match zod {
            true => format!("{}.parse(value)", self.ts.zod(method.response(), &path)?),
            false => format!("value as {response}"),
        };
        let name = method.method();
        let verb = match manifest.get(&key) {
            Some(_) => format!("manifest[\"{key}\"].verb"),
            None => format!("\"{}\"", method.verb()),
        };

        Ok(match method.kind() {
            MethodKind::Unary => format!(
                "      {name}: (input) => transport.call(\"{key}\", {verb}, input ?? null).then((value) => decodeWith(\"{key}\", () => {decode})),\n"
            ),
            MethodKind::Live => format!(
                "      {name}: (input) => ({{\n        subscribe: (onValue, onError = () => {{}}) =>\n          transport.subscribe(\n            \"{key}\",\n            input ?? null,\n            (value) => forward(\"{key}\", () => {decode}, onValue, onError),\n            onError,\n          ),\n      }}),\n"
            ),
        })
    }

    /// Render a type's definition inline, eg. a union of the error codes.
    fn inline(&self, ty: TypeRef) -> Result<String, RenderError> {
        match ty {
            TypeRef::Named(named) => self
                .ts
                .definition(&named.definition(), &named.origin.to_string()),
            ty => self.ts.reference(&ty, "client"),
        }
    }
}
