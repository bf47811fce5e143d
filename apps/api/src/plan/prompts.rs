// All LLM prompt constants for plan generation.
// Reuses the JSON rules from llm_client::prompts.

/// Plan generation prompt template.
/// Placeholders: {preamble}, {nome}, {altura}, {peso}, {idade}, {imc}, {frequencia},
/// {local}, {objetivo}, {restricoes}, {json_rules}, {json_example}, {closing}
pub const PLAN_PROMPT_TEMPLATE: &str = r#"{preamble}

DADOS DO USUÁRIO:
Nome: {nome} | Altura: {altura} cm | Peso: {peso} kg | Idade: {idade} anos
IMC: {imc} | Frequência: {frequencia} x/semana | Local: {local} | Objetivo: {objetivo}

SUAS OBRIGAÇÕES:
1. Retornar EXCLUSIVAMENTE um JSON válido, sem introduções, comentários ou explicações
2. Gerar {frequencia} dias de treino com 5-6 exercícios cada
3. Cada exercício: nome, series (texto), repeticoes (texto), descanso_segundos (número), detalhes_execucao, video_url
4. Incluir sugestões nutricionais com 3 opções cada (pre_treino e pos_treino): opcao_economica, opcao_equilibrada, opcao_premium
5. VERIFICAR TODAS AS VÍRGULAS E CHAVES - JSON DEVE SER 100% VÁLIDO
{restricoes}
{json_rules}

ESTRUTURA ESPERADA (apenas o formato; os valores marcados com "Ex.:" são ilustrativos):
{json_example}

OBSERVAÇÃO: Os valores do exemplo acima servem APENAS para mostrar o formato. Não copie
esses valores e não limite receitas, nomes ou campos similares ao que aparece no exemplo.
Gere opções variadas e relevantes para este usuário.

{closing}"#;

/// Exclusion clause for exercises. Placeholder: {itens}
pub const EXERCISE_EXCLUSION_TEMPLATE: &str = "\
- O usuário NÃO GOSTA dos seguintes exercícios, JAMAIS os inclua: {itens}.
  Substitua-os por alternativas equivalentes que trabalhem o mesmo grupo muscular.";

/// Exclusion clause for meals. Placeholder: {itens}
pub const MEAL_EXCLUSION_TEMPLATE: &str = "\
- O usuário NÃO GOSTA das seguintes refeições, JAMAIS as inclua: {itens}.
  Substitua-as por alternativas equivalentes com o mesmo papel de macronutrientes.";

pub const EXCLUSION_HEADER: &str = "RESTRIÇÕES DE PREFERÊNCIA (baseadas em feedback anterior do usuário):";

/// Structure-only exemplar. Repeats the day/meal shapes so the model sees that
/// lists and cost tiers are open-ended.
pub const JSON_EXAMPLE: &str = r#"{
    "nome_da_rotina": "Ex.: Programa de Hipertrofia",
    "dias_de_treino": [
        {
            "identificacao": "Ex.: Dia A",
            "foco_muscular": "Ex.: Peito e Tríceps",
            "exercicios": [
                {
                    "nome": "Ex.: Supino reto com barra",
                    "series": "Ex.: 4x",
                    "repeticoes": "Ex.: 8-12",
                    "descanso_segundos": 90,
                    "detalhes_execucao": "Ex.: Manter os ombros retraídos e controlar o movimento",
                    "video_url": "Ex.: https://www.youtube.com/results?search_query=como+fazer+supino+reto+com+barra"
                }
            ]
        },
        {
            "identificacao": "Ex.: Dia B",
            "foco_muscular": "Ex.: Costas e Bíceps",
            "exercicios": [
                {
                    "nome": "Ex.: Remada curvada",
                    "series": "Ex.: 3x",
                    "repeticoes": "Ex.: 10-12",
                    "descanso_segundos": 60,
                    "detalhes_execucao": "Ex.: Puxar a barra em direção ao abdômen",
                    "video_url": "Ex.: https://www.youtube.com/results?search_query=como+fazer+remada+curvada"
                }
            ]
        }
    ],
    "sugestoes_nutricionais": {
        "pre_treino": {
            "opcao_economica": {
                "nome": "Ex.: Banana com aveia",
                "custo_estimado": "Ex.: R$ 3,00",
                "ingredientes": ["Ex.: 1 banana", "Ex.: 2 colheres de aveia"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+banana+com+aveia",
                "explicacao": "Ex.: Carboidratos rápidos para energia"
            },
            "opcao_equilibrada": {
                "nome": "Ex.: Pão integral com pasta de amendoim",
                "custo_estimado": "Ex.: R$ 5,00",
                "ingredientes": ["Ex.: 2 fatias de pão integral", "Ex.: 2 colheres de pasta de amendoim"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+pao+integral+com+pasta+de+amendoim",
                "explicacao": "Ex.: Carboidratos e gorduras saudáveis"
            },
            "opcao_premium": {
                "nome": "Ex.: Tapioca com queijo e peito de peru",
                "custo_estimado": "Ex.: R$ 8,00",
                "ingredientes": ["Ex.: 3 colheres de goma de tapioca", "Ex.: 50g de peito de peru"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+tapioca+com+queijo+e+peito+de+peru",
                "explicacao": "Ex.: Proteínas e carboidratos de qualidade"
            }
        },
        "pos_treino": {
            "opcao_economica": {
                "nome": "Ex.: Arroz com ovo",
                "custo_estimado": "Ex.: R$ 4,00",
                "ingredientes": ["Ex.: 1 xícara de arroz", "Ex.: 2 ovos"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+arroz+com+ovo",
                "explicacao": "Ex.: Proteína e carboidratos para recuperação"
            },
            "opcao_equilibrada": {
                "nome": "Ex.: Frango grelhado com batata doce",
                "custo_estimado": "Ex.: R$ 7,00",
                "ingredientes": ["Ex.: 150g de frango", "Ex.: 200g de batata doce"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+frango+grelhado+com+batata+doce",
                "explicacao": "Ex.: Refeição completa para recuperação muscular"
            },
            "opcao_premium": {
                "nome": "Ex.: Salmão com quinoa e legumes",
                "custo_estimado": "Ex.: R$ 15,00",
                "ingredientes": ["Ex.: 150g de salmão", "Ex.: 1 xícara de quinoa"],
                "link_receita": "Ex.: https://www.google.com/search?q=como+fazer+salmao+com+quinoa+e+legumes",
                "explicacao": "Ex.: Ômega-3 e proteínas de alto valor biológico"
            }
        }
    }
}"#;
